//! Knee flexion angle from hip, knee and ankle positions.

use crate::error::CounterError;
use crate::geometry::Point2;

/// Segments shorter than this are treated as zero-length.
const MIN_SEGMENT_LENGTH: f32 = 1e-6;

/// Angle between the thigh (hip→knee) and shin (knee→ankle) vectors in degrees.
///
/// `cos(θ) = (v1 · v2) / (|v1| × |v2|)`, result in [0°, 180°]. The caller is
/// responsible for checking joint validity.
pub fn knee_angle(hip: Point2, knee: Point2, ankle: Point2) -> Result<f32, CounterError> {
    let v1 = knee - hip;
    let v2 = ankle - knee;

    let mag1 = v1.length();
    let mag2 = v2.length();
    if !(mag1 > MIN_SEGMENT_LENGTH && mag2 > MIN_SEGMENT_LENGTH) {
        return Err(CounterError::InvalidGeometry);
    }

    // 巨大な座標では内積や長さの積がinfに溢れる
    let cos_angle = v1.dot(v2) / (mag1 * mag2);
    if !cos_angle.is_finite() {
        return Err(CounterError::InvalidGeometry);
    }
    // 丸め誤差で±1を超えるとacosがNaNになる
    Ok(cos_angle.clamp(-1.0, 1.0).acos().to_degrees())
}
