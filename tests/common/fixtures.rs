use serde_json::{json, Value};
use wellness_engine::types::mesh;

pub const FRAME_WIDTH: f64 = 640.0;
pub const EYE_OPEN: f64 = 0.03;
pub const EYE_CLOSED: f64 = 0.005;

/// 478 点的人脸网格，测距点间距对应 `distance_cm`，双眼开合高度为 `eye`
pub fn face_mesh(distance_cm: f64, eye: f64) -> Value {
    let baseline = 6.3 * 600.0 / distance_cm / FRAME_WIDTH;
    let mut points = vec![(0.5, 0.5); 478];
    let right_x = 0.5 + baseline / 2.0;

    points[mesh::DISTANCE_LEFT] = (0.5 - baseline / 2.0, 0.5);
    points[mesh::DISTANCE_RIGHT] = (right_x, 0.5);
    points[mesh::LEFT_UPPER_LID] = (0.4, 0.4);
    points[mesh::LEFT_LOWER_LID] = (0.4, 0.4 + eye);
    // 右下眼睑与右测距点共用索引
    points[mesh::RIGHT_UPPER_LID] = (right_x, 0.5 - eye);

    Value::Array(
        points
            .into_iter()
            .map(|(x, y)| json!({ "x": x, "y": y, "z": 0.0 }))
            .collect(),
    )
}

pub fn frame_body(distance_cm: f64, eye: f64, timestamp_ms: i64) -> Value {
    json!({
        "landmarks": face_mesh(distance_cm, eye),
        "frameWidth": FRAME_WIDTH,
        "timestampMs": timestamp_ms,
    })
}

pub fn no_face_body(timestamp_ms: i64) -> Value {
    json!({ "landmarks": null, "timestampMs": timestamp_ms })
}
