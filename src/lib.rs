//! Adsorption capacity prediction for Methylene Blue onto hydrothermal carbon.
//!
//! Twelve synthesis, structure and adsorption parameters are validated against a fixed
//! [`schema`], fed to a pre-trained regressor loaded once per process ([`model`]), and the
//! rounded result can be exported as delimited text ([`export`]).

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod schema;
mod session;

pub use config::Config;
pub use error::{PredictorErr, Result, ValidationReason};
pub use export::{from_delimited_text, to_delimited_text, ExportedRow};
pub use model::{load_model, ModelCache, ModelHandle, Regressor};
pub use pipeline::{predict, FeatureVector, PredictionRecord, RawValue, RawValues};
pub use session::Session;

pub const APP_TITLE: &str = "Prediction of Methylene Blue Adsorption onto Hydrothermal Carbon";

pub const APP_DESCRIPTION: &str = "This model estimates the adsorption capacity (Q, mmol/g) of \
     hydrothermal carbon based on synthesis, structure, and adsorption conditions.";
