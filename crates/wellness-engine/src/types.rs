//! 关键点帧类型
//!
//! 外部人脸检测器每帧输出一组归一化的二维关键点，引擎只消费其中的
//! 少量命名点：测距用的一对眼部点，以及每只眼睛的上下眼睑点。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 毫秒级 Unix 时间戳
pub type TimestampMs = i64;

/// Face-mesh indices used by the engine.
pub mod mesh {
    /// Left eye point used for the distance baseline.
    pub const DISTANCE_LEFT: usize = 145;
    /// Right eye point used for the distance baseline.
    pub const DISTANCE_RIGHT: usize = 374;
    pub const LEFT_UPPER_LID: usize = 159;
    pub const LEFT_LOWER_LID: usize = 23;
    pub const RIGHT_UPPER_LID: usize = 386;
    pub const RIGHT_LOWER_LID: usize = 374;

    /// Smallest mesh that contains every index above.
    pub const MIN_POINTS: usize = 387;
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("face mesh has {got} points, need at least {need}")]
    TooFewPoints { got: usize, need: usize },
    #[error("flat landmark array has odd length {0}")]
    OddCoordinateCount(usize),
}

/// 单帧中引擎需要的命名关键点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkFrame {
    pub distance_left: Point,
    pub distance_right: Point,
    pub left_upper_lid: Point,
    pub left_lower_lid: Point,
    pub right_upper_lid: Point,
    pub right_lower_lid: Point,
}

impl LandmarkFrame {
    /// Picks the named points out of a full face mesh.
    pub fn from_face_mesh(points: &[Point]) -> Result<Self, LandmarkError> {
        if points.len() < mesh::MIN_POINTS {
            return Err(LandmarkError::TooFewPoints {
                got: points.len(),
                need: mesh::MIN_POINTS,
            });
        }

        Ok(Self {
            distance_left: points[mesh::DISTANCE_LEFT],
            distance_right: points[mesh::DISTANCE_RIGHT],
            left_upper_lid: points[mesh::LEFT_UPPER_LID],
            left_lower_lid: points[mesh::LEFT_LOWER_LID],
            right_upper_lid: points[mesh::RIGHT_UPPER_LID],
            right_lower_lid: points[mesh::RIGHT_LOWER_LID],
        })
    }

    /// Same as [`from_face_mesh`](Self::from_face_mesh) for an interleaved
    /// `x0, y0, x1, y1, ...` buffer.
    pub fn from_flat_mesh(coords: &[f64]) -> Result<Self, LandmarkError> {
        if coords.len() % 2 != 0 {
            return Err(LandmarkError::OddCoordinateCount(coords.len()));
        }
        let points: Vec<Point> = coords
            .chunks_exact(2)
            .map(|c| Point::new(c[0], c[1]))
            .collect();
        Self::from_face_mesh(&points)
    }

    /// 两眼平均开合高度（归一化坐标）
    pub fn eye_opening(&self) -> f64 {
        let left = self.left_upper_lid.distance_to(&self.left_lower_lid);
        let right = self.right_upper_lid.distance_to(&self.right_lower_lid);
        (left + right) / 2.0
    }
}
