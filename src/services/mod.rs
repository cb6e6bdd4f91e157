pub mod admin_stats;
pub mod assistant;
pub mod comments;
pub mod follows;
pub mod messages;
pub mod posts;
pub mod reactions;
pub mod recommendations;
pub mod settings;
pub mod signals;
pub mod taxonomy;
pub mod users;
