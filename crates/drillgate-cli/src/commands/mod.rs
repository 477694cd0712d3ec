pub mod analytics;
pub mod manifest_show;
pub mod promote;
pub mod rollback;
pub mod validate;
