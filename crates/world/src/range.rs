//! Reach predicates for tools and weapons.

use std::f64::consts::{PI, TAU};

use glam::DVec2;

use crate::entity::Hittable;

/// A single reach point with a circular tolerance around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRange {
    reach_point: DVec2,
    tolerance_sq: f64,
}

impl PointRange {
    /// Reach point at `origin + facing * reach`. `facing` should be a unit vector.
    pub fn new(origin: DVec2, facing: DVec2, reach: f64, tolerance_sq: f64) -> Self {
        Self {
            reach_point: origin + facing * reach,
            tolerance_sq,
        }
    }

    pub fn reach_point(&self) -> DVec2 {
        self.reach_point
    }

    /// Squared distance from the reach point to the target's hitbox centre.
    pub fn distance_sq(&self, target: &dyn Hittable) -> f64 {
        self.reach_point.distance_squared(target.hitbox_center())
    }

    /// Returns true when the target lies OUTSIDE the tolerance circle.
    ///
    /// The name is historical; callers negate it to mean "within reach".
    pub fn in_range(&self, target: &dyn Hittable) -> bool {
        self.distance_sq(target) > self.tolerance_sq
    }
}

/// Result of one [`ArcRange`] query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeHit {
    /// Target is inside the sector.
    pub in_range: bool,
    /// Squared distance from the origin to the target's hitbox centre.
    pub distance_sq: f64,
}

/// Circular sector around a facing direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcRange {
    origin: DVec2,
    reach_sq: f64,
    lower: f64,
    upper: f64,
    crosses_pi: bool,
    full_circle: bool,
}

impl ArcRange {
    pub fn new(origin: DVec2, facing: DVec2, half_angle: f64, reach_sq: f64) -> Self {
        let facing_angle = facing.y.atan2(facing.x);
        let mut lower = facing_angle - half_angle;
        let mut upper = facing_angle + half_angle;
        let mut crosses_pi = false;
        if lower < -PI {
            lower += TAU;
            crosses_pi = true;
        } else if upper > PI {
            upper -= TAU;
            crosses_pi = true;
        }
        Self {
            origin,
            reach_sq,
            lower,
            upper,
            crosses_pi,
            full_circle: half_angle >= PI,
        }
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    /// Whether a bearing (radians, `atan2` convention) lies inside the sector.
    pub fn contains_bearing(&self, bearing: f64) -> bool {
        if self.full_circle {
            return true;
        }
        if self.crosses_pi {
            bearing >= self.lower || bearing <= self.upper
        } else {
            bearing >= self.lower && bearing <= self.upper
        }
    }

    /// Test a target and report its squared distance in one call.
    pub fn query(&self, target: &dyn Hittable) -> RangeHit {
        let delta = target.hitbox_center() - self.origin;
        let distance_sq = delta.length_squared();
        let in_range = distance_sq <= self.reach_sq + target.hit_radius_sq()
            && (distance_sq == 0.0 || self.contains_bearing(delta.y.atan2(delta.x)));
        RangeHit {
            in_range,
            distance_sq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::HitCircle;

    fn point(x: f64, y: f64) -> HitCircle {
        HitCircle {
            center: DVec2::new(x, y),
            radius_sq: 0.0,
        }
    }

    #[test]
    fn point_range_is_true_outside_tolerance() {
        let range = PointRange::new(DVec2::ZERO, DVec2::new(1.0, 0.0), 10.0, 4.0);
        assert_eq!(range.reach_point(), DVec2::new(10.0, 0.0));
        assert!(!range.in_range(&point(11.0, 0.0)));
        assert!(range.in_range(&point(13.0, 0.0)));
        assert!(range.in_range(&point(0.0, 0.0)));
    }

    #[test]
    fn arc_includes_both_sides_of_pi() {
        // Facing left: the sector straddles the -pi/pi seam.
        let arc = ArcRange::new(DVec2::ZERO, DVec2::new(-1.0, 0.0), 0.5, 100.0);
        let eps = 0.01_f64;
        let above = point(-5.0 * eps.cos(), 5.0 * eps.sin());
        let below = point(-5.0 * eps.cos(), -5.0 * eps.sin());
        assert!(arc.query(&above).in_range);
        assert!(arc.query(&below).in_range);
        assert!(!arc.query(&point(5.0, 0.0)).in_range);
        assert!(!arc.query(&point(0.0, 5.0)).in_range);
    }

    #[test]
    fn arc_without_seam_uses_and() {
        let arc = ArcRange::new(DVec2::ZERO, DVec2::new(1.0, 0.0), 0.5, 100.0);
        assert!(arc.query(&point(5.0, 1.0)).in_range);
        assert!(!arc.query(&point(-5.0, 0.1)).in_range);
        assert!(!arc.query(&point(-5.0, -0.1)).in_range);
    }

    #[test]
    fn arc_reports_distance_and_counts_hit_radius() {
        let arc = ArcRange::new(DVec2::ZERO, DVec2::new(0.0, 1.0), 0.5, 25.0);
        let far = HitCircle {
            center: DVec2::new(0.0, 6.0),
            radius_sq: 16.0,
        };
        let hit = arc.query(&far);
        assert_eq!(hit.distance_sq, 36.0);
        assert!(hit.in_range);

        let small = point(0.0, 6.0);
        assert!(!arc.query(&small).in_range);
        assert_eq!(arc.query(&small).distance_sq, 36.0);
    }

    #[test]
    fn arc_seam_when_upper_bound_exceeds_pi() {
        // Facing slightly below the negative x axis in atan2 terms.
        let facing = DVec2::new((PI - 0.2).cos(), (PI - 0.2).sin());
        let arc = ArcRange::new(DVec2::ZERO, facing, 0.5, 100.0);
        let across = DVec2::new((-PI + 0.1).cos(), (-PI + 0.1).sin()) * 5.0;
        assert!(arc.query(&point(across.x, across.y)).in_range);
    }
}
