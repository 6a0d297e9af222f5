//! Reference lists for building filter UIs.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::db::models::{Color, Subject, Technique, Tool};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reference/colors", get(colors))
        .route("/api/reference/subjects", get(subjects))
        .route("/api/reference/tools", get(tools))
        .route("/api/reference/techniques", get(techniques))
        .route("/api/reference/tools/{id}/techniques", get(tool_techniques))
}

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
}

impl From<Tool> for ToolSummary {
    fn from(t: Tool) -> Self {
        ToolSummary {
            id: t.id,
            name: t.name,
            category: t.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TechniqueSummary {
    pub id: String,
    pub name: String,
    pub difficulty_level: Option<String>,
}

impl From<Technique> for TechniqueSummary {
    fn from(t: Technique) -> Self {
        TechniqueSummary {
            id: t.id,
            name: t.name,
            difficulty_level: t.difficulty_level,
        }
    }
}

async fn colors(State(state): State<AppState>) -> ApiResult<Json<Vec<Color>>> {
    let colors = state.with_handle(|db| Ok(db.list_colors()?)).await?;
    Ok(Json(colors))
}

async fn subjects(State(state): State<AppState>) -> ApiResult<Json<Vec<Subject>>> {
    let subjects = state.with_handle(|db| Ok(db.list_subjects()?)).await?;
    Ok(Json(subjects))
}

async fn tools(State(state): State<AppState>) -> ApiResult<Json<Vec<ToolSummary>>> {
    let tools = state.with_handle(|db| Ok(db.list_tools()?)).await?;
    Ok(Json(tools.into_iter().map(ToolSummary::from).collect()))
}

async fn techniques(State(state): State<AppState>) -> ApiResult<Json<Vec<TechniqueSummary>>> {
    let techniques = state.with_handle(|db| Ok(db.list_techniques()?)).await?;
    Ok(Json(
        techniques.into_iter().map(TechniqueSummary::from).collect(),
    ))
}

/// Techniques that can be painted with the given tool.
async fn tool_techniques(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Technique>>> {
    let techniques = state
        .with_handle(move |db| {
            if db.get_tool(&id)?.is_none() {
                return Err(ApiError::NotFound(format!("tool {id} not found")));
            }
            Ok(db.techniques_for_tool(&id)?)
        })
        .await?;
    Ok(Json(techniques))
}
