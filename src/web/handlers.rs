use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use super::{
    Result,
    extract::AuthenticatedOwner,
    models::{
        ApiMessage, ApiResponse, CreateTableRequest, CredentialsRequest, RowPayload, TableView,
        TokenResponse, UpdateFieldsRequest, VersionQuery,
    },
    state::AppState,
};
use crate::core::{OwnerId, Row, RowAddress, RowId, TableId};
use crate::storage::TableSummary;

pub async fn healthcheck() -> Json<ApiResponse<ApiMessage>> {
    Json(ApiResponse {
        data: ApiMessage::new("ok"),
    })
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>)> {
    let account = state.users.signup(&payload.email, &payload.password).await?;
    let token = state.tokens.issue(&account.owner_id())?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: TokenResponse { token },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>> {
    let account = state.users.login(&payload.email, &payload.password).await?;
    let token = state.tokens.issue(&account.owner_id())?;
    info!(user_id = %account.owner_id(), "user logged in");
    Ok(Json(ApiResponse {
        data: TokenResponse { token },
    }))
}

pub async fn create_table(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Json(payload): Json<CreateTableRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TableView>>)> {
    let table = state
        .tables
        .create_table(&owner, &payload.table_name, &payload.fields)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: TableView::from(table.as_ref()),
        }),
    ))
}

pub async fn list_tables(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> Result<Json<ApiResponse<Vec<TableSummary>>>> {
    let tables = state.tables.list_tables(&owner).await?;
    Ok(Json(ApiResponse { data: tables }))
}

pub async fn get_table(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TableView>>> {
    let table = state.tables.get_table(&owner, TableId::from(id)).await?;
    Ok(Json(ApiResponse {
        data: TableView::from(table.as_ref()),
    }))
}

pub async fn delete_table(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApiMessage>>> {
    state.tables.delete_table(&owner, TableId::from(id)).await?;
    Ok(Json(ApiResponse {
        data: ApiMessage::new("Table deleted"),
    }))
}

pub async fn update_fields(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
    Json(payload): Json<UpdateFieldsRequest>,
) -> Result<Json<ApiResponse<TableView>>> {
    let table = state
        .tables
        .update_fields(&owner, TableId::from(id), &payload.fields, query.version)
        .await?;
    Ok(Json(ApiResponse {
        data: TableView::from(table.as_ref()),
    }))
}

pub async fn add_record(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
    Json(payload): Json<RowPayload>,
) -> Result<(StatusCode, Json<ApiResponse<Row>>)> {
    let row = state
        .tables
        .add_row(&owner, TableId::from(id), payload.into_values(), query.version)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse { data: row })))
}

pub async fn update_record(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path((id, index)): Path<(Uuid, usize)>,
    Query(query): Query<VersionQuery>,
    Json(payload): Json<RowPayload>,
) -> Result<Json<ApiResponse<Row>>> {
    replace_row(
        &state,
        owner,
        id,
        RowAddress::Position(index),
        payload,
        query,
    )
    .await
}

pub async fn delete_record(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path((id, index)): Path<(Uuid, usize)>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<ApiResponse<Row>>> {
    remove_row(&state, owner, id, RowAddress::Position(index), query).await
}

pub async fn update_row_by_id(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path((id, row_id)): Path<(Uuid, u64)>,
    Query(query): Query<VersionQuery>,
    Json(payload): Json<RowPayload>,
) -> Result<Json<ApiResponse<Row>>> {
    replace_row(
        &state,
        owner,
        id,
        RowAddress::Id(RowId::new(row_id)),
        payload,
        query,
    )
    .await
}

pub async fn delete_row_by_id(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path((id, row_id)): Path<(Uuid, u64)>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<ApiResponse<Row>>> {
    remove_row(&state, owner, id, RowAddress::Id(RowId::new(row_id)), query).await
}

async fn replace_row(
    state: &AppState,
    owner: OwnerId,
    id: Uuid,
    address: RowAddress,
    payload: RowPayload,
    query: VersionQuery,
) -> Result<Json<ApiResponse<Row>>> {
    let row = state
        .tables
        .update_row(
            &owner,
            TableId::from(id),
            address,
            payload.into_values(),
            query.version,
        )
        .await?;
    Ok(Json(ApiResponse { data: row }))
}

async fn remove_row(
    state: &AppState,
    owner: OwnerId,
    id: Uuid,
    address: RowAddress,
    query: VersionQuery,
) -> Result<Json<ApiResponse<Row>>> {
    let row = state
        .tables
        .delete_row(&owner, TableId::from(id), address, query.version)
        .await?;
    Ok(Json(ApiResponse { data: row }))
}
