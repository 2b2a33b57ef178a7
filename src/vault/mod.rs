pub mod audit;
pub mod carrier;
pub mod engine;
pub mod enumerate;
pub mod frontmatter;
pub mod links;
pub mod lock;
pub mod paths;
pub mod prompt;
pub mod record;
pub mod resolver;
pub mod settings;
pub mod state;
pub mod store;
pub mod undo;
pub mod util;
