pub mod attempt;
pub mod flag;
pub mod progress;
pub mod question;
pub mod quiz;
pub mod response;

pub use attempt::{AttemptStatus, CompleteAttemptRequest, QuizAttempt, UpdateAttemptRequest};
pub use flag::{FlagQuestionRequest, FlagStatus, FlaggedQuestion};
pub use progress::{CategoryProgress, QuizProgress};
pub use question::{Choice, DeliveredQuestion, Question};
pub use quiz::{AddQuestionRequest, Category, Quiz, QuizQuestion, ReorderRequest};
pub use response::{Bookmark, CreateBookmarkRequest, IncorrectResponse, RecordIncorrectRequest};
