//! Results written back onto the finished store graph for the optimization passes.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectAnnotation {
    pub preexisting: bool,
    pub unique: bool,
    pub final_: bool,
    pub uniform: bool,
    pub input: bool,
}

impl ObjectAnnotation {
    pub fn with_preexisting(self, preexisting: bool) -> Self {
        Self {
            preexisting,
            ..self
        }
    }

    pub fn with_unique(self, unique: bool) -> Self {
        Self { unique, ..self }
    }

    pub fn with_final(self, final_: bool) -> Self {
        Self { final_, ..self }
    }

    pub fn with_uniform(self, uniform: bool) -> Self {
        Self { uniform, ..self }
    }

    pub fn with_input(self, input: bool) -> Self {
        Self { input, ..self }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldAnnotation {
    pub unique: bool,
}

impl FieldAnnotation {
    pub fn with_unique(self, unique: bool) -> Self {
        Self { unique }
    }
}
