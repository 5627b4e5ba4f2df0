pub mod artists;
pub mod artworks;
pub mod trash;

use crate::state::AppState;
use crate::services::trash::TrashService;

fn trash_service(state: &AppState) -> TrashService {
    TrashService::new(
        state.pool.as_ref().clone(),
        state.config.trash_retention_days,
    )
}
