#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrimitivePolicy {
    // Numbers, bools and strings get one abstract object per class: no allocation path and no
    // allocating op.
    Collapse,
    // Primitives keep their allocation path and op. They are still never split by index.
    Precise,
}

impl Default for PrimitivePolicy {
    fn default() -> Self {
        PrimitivePolicy::Collapse
    }
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub primitive_policy: PrimitivePolicy,

    /// Signatures with at least this many parameters almost always mean the analysis is looping
    /// on an ever-growing `*args` tuple.
    pub max_signature_params: usize,

    pub report_infeasible_calls: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            primitive_policy: PrimitivePolicy::default(),
            max_signature_params: 30,
            report_infeasible_calls: true,
        }
    }
}
