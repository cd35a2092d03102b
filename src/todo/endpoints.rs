use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::data::BoardState;
use crate::internal_error::InternalResult;
use crate::users::session::Session;

use super::data::*;
use super::helpers::settle_mutation;
use super::sync::SyncHandle;

#[get("/get_board")]
pub fn get_board(_session: Session, board: &State<BoardState>) -> InternalResult<Json<BoardSnapshot>> {
    let board = board.lock()?;

    Ok(Json(board.snapshot()))
}

#[post("/add_category", format = "json", data = "<add_category_request>")]
pub async fn add_category(
    _session: Session,
    add_category_request: Json<AddCategoryRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<Json<Category>> {
    let (category, pending) = {
        let mut board = board.lock()?;
        let (category, mutation) = board.add_category(&add_category_request.name)?;
        (category, sync.send(mutation))
    };

    settle_mutation(pending, sync, board).await?;

    Ok(Json(category))
}

#[post("/rename_category", format = "json", data = "<rename_category_request>")]
pub async fn rename_category(
    _session: Session,
    rename_category_request: Json<RenameCategoryRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<Json<RenameCategoryResult>> {
    let (renamed, pending) = {
        let mut board = board.lock()?;
        let (renamed, mutation) = board
            .reconciler()
            .rename_category(&rename_category_request.id, &rename_category_request.name)?;
        (renamed, sync.send(mutation))
    };

    settle_mutation(pending, sync, board).await?;
    tracing::info!(
        id = %renamed.category.id,
        old_name = %renamed.old_name,
        new_name = %renamed.category.name,
        relabelled = renamed.relabelled,
        "category renamed"
    );

    Ok(Json(RenameCategoryResult {
        category: renamed.category,
        relabelled: renamed.relabelled,
    }))
}

#[post("/delete_category", format = "json", data = "<delete_category_request>")]
pub async fn delete_category(
    _session: Session,
    delete_category_request: Json<DeleteCategoryRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<Json<Category>> {
    let (category, pending) = {
        let mut board = board.lock()?;
        let (category, mutation) = board.reconciler().delete_category(&delete_category_request.id)?;
        (category, sync.send(mutation))
    };

    settle_mutation(pending, sync, board).await?;

    Ok(Json(category))
}

#[post("/reorder_categories", format = "json", data = "<reorder_categories_request>")]
pub async fn reorder_categories(
    _session: Session,
    reorder_categories_request: Json<ReorderCategoriesRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<Json<Vec<Category>>> {
    let (categories, pending) = {
        let mut board = board.lock()?;
        let mutation = board
            .reconciler()
            .reorder_categories(&reorder_categories_request.ids)?;
        (board.registry().categories().to_vec(), sync.send(mutation))
    };

    settle_mutation(pending, sync, board).await?;

    Ok(Json(categories))
}

#[post("/add_todo", format = "json", data = "<add_todo_request>")]
pub async fn add_todo(
    _session: Session,
    add_todo_request: Json<AddTodoRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<Json<Todo>> {
    let (todo, pending) = {
        let mut board = board.lock()?;
        let (todo, mutation) = board.add_todo(&add_todo_request.text, &add_todo_request.category_name)?;
        (todo, sync.send(mutation))
    };

    settle_mutation(pending, sync, board).await?;

    Ok(Json(todo))
}

#[post("/update_todo", format = "json", data = "<update_todo_request>")]
pub async fn update_todo(
    _session: Session,
    update_todo_request: Json<UpdateTodoRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<Json<Todo>> {
    let (todo, pending) = {
        let mut board = board.lock()?;
        let (todo, mutation) = board.update_todo(&update_todo_request.id, &update_todo_request.patch)?;
        (todo, sync.send(mutation))
    };

    settle_mutation(pending, sync, board).await?;

    Ok(Json(todo))
}

#[post("/delete_todo", format = "json", data = "<delete_todo_request>")]
pub async fn delete_todo(
    _session: Session,
    delete_todo_request: Json<DeleteTodoRequest>,
    board: &State<BoardState>,
    sync: &State<SyncHandle>,
) -> InternalResult<()> {
    let pending = {
        let mut board = board.lock()?;
        let (_, mutation) = board.remove_todo(&delete_todo_request.id)?;
        sync.send(mutation)
    };

    settle_mutation(pending, sync, board).await?;

    Ok(())
}
