//! The single activation function the priority evaluator uses.

/// Steepness constant from the reference design; sharper than the
/// textbook logistic curve so that small weights still saturate nodes.
pub const ACTIVATION_STEEPNESS: f32 = 4.9;

/// σ(x) = 1 / (1 + exp(-4.9x)). Strictly increasing, σ(0) = 0.5, range (0, 1).
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-ACTIVATION_STEEPNESS * x).exp())
}
