pub mod activity_log;
pub mod artist;
pub mod artwork;
pub mod trash_log_store;

pub use trash_log_store::{
    ArtworkCatalog, PgArtworkCatalog, PgTrashLog, TrashLogStore,
};
