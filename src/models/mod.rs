pub mod answer;
pub mod answer_key;
pub mod credentials;
pub mod loaders;
pub mod survey;

pub use answer::{AnswerPayload, AnswerValue, SubAnswer};
pub use answer_key::{AnswerKeyStore, AnswerText, AnswerVariant};
pub use credentials::Credentials;
pub use loaders::load_answer_key;
pub use survey::{
    AnswerableResponse, CaptchaChallenge, Choice, Id, LocalizedText, QuestionSchema,
    QuestionType, ResponseRef, SubQuestion, SurveySchema, SurveyTarget,
};
