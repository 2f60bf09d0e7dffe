use serde::{Deserialize, Serialize};

/// Screen-space 2-D point or direction. +x is right, +y is down, units are
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_angle(radians: f64) -> Self {
        Self {
            x: radians.cos(),
            y: radians.sin(),
        }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(self) -> Vector2 {
        let len = self.length();
        if len < f64::EPSILON {
            Vector2::ZERO
        } else {
            Vector2::new(self.x / len, self.y / len)
        }
    }

    pub fn scale(self, factor: f64) -> Vector2 {
        Vector2::new(self.x * factor, self.y * factor)
    }

    pub fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance(self, other: Vector2) -> f64 {
        self.sub(other).length()
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Replaces NaN/Inf components with 0, per spec's state-corruption defence.
    pub fn sanitize(self) -> Vector2 {
        Vector2::new(sanitize_component(self.x), sanitize_component(self.y))
    }
}

fn sanitize_component(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let v = Vector2::new(3.0, 4.0);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < 1e-9);
        assert_eq!(n.normalize(), n);
    }

    #[test]
    fn zero_vector_normalizes_to_zero() {
        assert_eq!(Vector2::ZERO.normalize(), Vector2::ZERO);
    }

    #[test]
    fn sanitize_replaces_nan_and_inf() {
        let v = Vector2::new(f64::NAN, f64::INFINITY);
        let s = v.sanitize();
        assert_eq!(s, Vector2::ZERO);
    }
}
