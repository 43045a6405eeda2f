pub mod fallback;
pub mod history;
pub mod model;
pub mod normalize;
pub mod service;
pub mod source;

pub use model::Question;
pub use service::QuestionService;
pub use source::{FetchParams, HttpQuestionSource, QuestionSource};
