use crate::{
    error::Result,
    export,
    model::ModelHandle,
    pipeline::{self, PredictionRecord, RawValues},
};

/// One user's interaction with the form: a model to predict with and the last result shown.
#[derive(Debug)]
pub struct Session {
    model: ModelHandle,
    last: Option<PredictionRecord>,
}

impl Session {
    pub fn new(model: ModelHandle) -> Self {
        Self { model, last: None }
    }

    /// Runs a prediction for the submitted values and keeps it as the last result.
    ///
    /// The previous result is discarded before predicting, so a failed submission leaves no
    /// result behind.
    pub fn submit(&mut self, raw: &RawValues) -> Result<&PredictionRecord> {
        self.last = None;
        let record = pipeline::predict(&self.model, raw)?;
        Ok(&*self.last.insert(record))
    }

    pub fn last(&self) -> Option<&PredictionRecord> {
        self.last.as_ref()
    }

    /// The last result as delimited text, if there is one.
    pub fn export(&self) -> Option<Vec<u8>> {
        self.last.as_ref().map(export::to_delimited_text)
    }
}
