//! Structuring elements for binary morphology
//!
//! Elements are expressed in pixel offsets. [`StructuringElement::Ground`]
//! is built from a ground distance and the pixel size, so anisotropic pixels
//! give elliptical footprints.

use scarmap_core::{Error, Result};

/// Shape of a structuring element
#[derive(Debug, Clone, PartialEq)]
pub enum StructuringElement {
    /// Square element of given radius (side = 2*radius + 1)
    Square(usize),
    /// Every cell whose centre lies within `distance` ground units of the
    /// centre cell
    Ground {
        distance: f64,
        pixel_width: f64,
        pixel_height: f64,
    },
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Square(1)
    }
}

impl StructuringElement {
    /// Validate the structuring element, returning an error for invalid configurations
    pub fn validate(&self) -> Result<()> {
        match self {
            StructuringElement::Square(_) => Ok(()),
            StructuringElement::Ground {
                distance,
                pixel_width,
                pixel_height,
            } => {
                if !distance.is_finite() || *distance < 0.0 {
                    return Err(Error::InvalidParameter {
                        name: "distance",
                        value: distance.to_string(),
                        reason: "buffer distance must be finite and non-negative".to_string(),
                    });
                }
                for (name, size) in [("pixel_width", pixel_width), ("pixel_height", pixel_height)] {
                    if !size.is_finite() || *size == 0.0 {
                        return Err(Error::InvalidParameter {
                            name,
                            value: size.to_string(),
                            reason: "pixel size must be finite and non-zero".to_string(),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Half-extent in (rows, cols)
    pub fn radius(&self) -> (usize, usize) {
        match self {
            StructuringElement::Square(r) => (*r, *r),
            StructuringElement::Ground {
                distance,
                pixel_width,
                pixel_height,
            } => (
                (distance / pixel_height.abs()).floor() as usize,
                (distance / pixel_width.abs()).floor() as usize,
            ),
        }
    }

    /// Compute (dr, dc) offsets relative to center for all active cells
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let (rr, rc) = self.radius();
        let (rr, rc) = (rr as isize, rc as isize);

        let mut offsets = Vec::new();
        for dr in -rr..=rr {
            for dc in -rc..=rc {
                let active = match self {
                    StructuringElement::Square(_) => true,
                    StructuringElement::Ground {
                        distance,
                        pixel_width,
                        pixel_height,
                    } => {
                        let dy = dr as f64 * pixel_height.abs();
                        let dx = dc as f64 * pixel_width.abs();
                        dx.hypot(dy) <= *distance
                    }
                };
                if active {
                    offsets.push((dr, dc));
                }
            }
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_offsets() {
        let offsets = StructuringElement::Square(1).offsets();
        assert_eq!(offsets.len(), 9);
        assert!(offsets.contains(&(0, 0)));
        assert!(offsets.contains(&(-1, -1)));
    }

    #[test]
    fn test_ground_element_square_pixels() {
        // 1.5 pixels: the full 3x3 block (diagonal 1.414 <= 1.5), nothing at 2
        let se = StructuringElement::Ground {
            distance: 15.0,
            pixel_width: 10.0,
            pixel_height: -10.0,
        };
        let offsets = se.offsets();
        assert_eq!(offsets.len(), 9);
        assert!(!offsets.contains(&(0, 2)));
    }

    #[test]
    fn test_ground_element_anisotropic_pixels() {
        // 10 m wide, 5 m tall: reaches one column and three rows
        let se = StructuringElement::Ground {
            distance: 15.0,
            pixel_width: 10.0,
            pixel_height: -5.0,
        };
        let offsets = se.offsets();
        assert!(offsets.contains(&(3, 0)));
        assert!(offsets.contains(&(0, 1)));
        assert!(!offsets.contains(&(0, 2)));
        assert!(!offsets.contains(&(3, 1)));
        assert!(offsets.contains(&(2, 1)));
    }

    #[test]
    fn test_validate() {
        let bad = StructuringElement::Ground {
            distance: -1.0,
            pixel_width: 10.0,
            pixel_height: -10.0,
        };
        assert!(bad.validate().is_err());

        let zero = StructuringElement::Ground {
            distance: 1.0,
            pixel_width: 0.0,
            pixel_height: -10.0,
        };
        assert!(zero.validate().is_err());
        assert!(StructuringElement::default().validate().is_ok());
    }
}
