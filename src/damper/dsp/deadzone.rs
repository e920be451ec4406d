use crate::config::DeadzoneMode;

/// Suppress errors smaller than `tolerance`.
///
/// Hard mode snaps them to zero. Soft mode scales by `(|e| / tolerance)^2`,
/// which meets the identity at the boundary and is flat at the origin.
/// Returns the output and whether the deadzone branch fired.
pub fn deadzone(error: f64, tolerance: f64, mode: DeadzoneMode) -> (f64, bool) {
    let abs_err = error.abs();
    if abs_err < tolerance {
        let out = match mode {
            DeadzoneMode::Hard => 0.0,
            DeadzoneMode::Soft => {
                let ratio = abs_err / tolerance;
                error * ratio * ratio
            }
        };
        (out, true)
    } else {
        (error, false)
    }
}
