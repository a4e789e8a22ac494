//! Keyframe sequence document tree and its XML rendering
//!
//! The rendered envelope (root element attributes and schema location) is
//! read by the engine's model importer and must stay byte-for-byte stable.

use super::types::TRANSFORM_LEN;
use bytes::Bytes;
use std::fmt::Write;

/// Root element opening tag, including the schema location the importer checks
pub const ROOT_OPEN: &str = r#"<roblox xmlns:xmime="http://www.w3.org/2005/05/xmlmime" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://www.roblox.com/roblox.xsd" version="4">"#;

/// Root element closing tag
pub const ROOT_CLOSE: &str = "</roblox>";

/// Display name used when a sequence name is blank
pub const DEFAULT_SEQUENCE_NAME: &str = "ExportedAnimation";

/// Fixed `EasingDirection` token emitted on every pose
pub const EASING_DIRECTION: u8 = 1;

/// Fixed pose weight
pub const POSE_WEIGHT: f64 = 1.0;

/// Slot names of a `CoordinateFrame`, in transform order
const CFRAME_FIELDS: [&str; TRANSFORM_LEN] = [
    "X", "Y", "Z", "R00", "R01", "R02", "R10", "R11", "R12", "R20", "R21", "R22",
];

/// Encoded keyframe sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Display name of the root container
    pub name: String,
    /// Time nodes, strictly ascending by time
    pub keyframes: Vec<TimeNode>,
}

/// All poses sharing one rounded time
#[derive(Debug, Clone, PartialEq)]
pub struct TimeNode {
    pub time: f64,
    /// Poses in input order
    pub poses: Vec<PoseNode>,
}

/// One part's pose inside a time node
#[derive(Debug, Clone, PartialEq)]
pub struct PoseNode {
    pub part: String,
    pub cframe: [f64; TRANSFORM_LEN],
    pub easing_direction: u8,
    pub easing_style: u8,
    pub weight: f64,
}

impl Document {
    /// Total number of poses across all time nodes
    pub fn pose_count(&self) -> usize {
        self.keyframes.iter().map(|k| k.poses.len()).sum()
    }

    /// Render the document as engine XML.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(512 + self.pose_count() * 900);
        out.push_str(ROOT_OPEN);
        out.push('\n');
        out.push_str("    <Item class=\"KeyframeSequence\" referent=\"RBX0\">\n");
        out.push_str("        <Properties>\n");
        let _ = writeln!(
            out,
            "            <string name=\"Name\">{}</string>",
            escape_text(&self.name)
        );
        out.push_str("        </Properties>\n");

        for (idx, node) in self.keyframes.iter().enumerate() {
            let _ = writeln!(out, "        <Item class=\"Keyframe\" referent=\"KF{}\">", idx);
            out.push_str("            <Properties>\n");
            let _ = writeln!(
                out,
                "                <float name=\"Time\">{}</float>",
                format_number(node.time)
            );
            out.push_str("            </Properties>\n");

            for (pose_idx, pose) in node.poses.iter().enumerate() {
                render_pose(&mut out, idx, pose_idx, pose);
            }

            out.push_str("        </Item>\n");
        }

        out.push_str("    </Item>\n");
        out.push_str(ROOT_CLOSE);
        out
    }

    /// Rendered document as an owned byte buffer
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.render())
    }
}

fn render_pose(out: &mut String, idx: usize, pose_idx: usize, pose: &PoseNode) {
    let _ = writeln!(
        out,
        "            <Item class=\"Pose\" referent=\"P{}_{}\">",
        idx, pose_idx
    );
    out.push_str("                <Properties>\n");
    out.push_str("                    <CoordinateFrame name=\"CFrame\">\n");
    for (field, value) in CFRAME_FIELDS.iter().zip(pose.cframe.iter()) {
        let _ = writeln!(
            out,
            "                        <{field}>{}</{field}>",
            format_number(*value)
        );
    }
    out.push_str("                    </CoordinateFrame>\n");
    let _ = writeln!(
        out,
        "                    <token name=\"EasingDirection\">{}</token>",
        pose.easing_direction
    );
    let _ = writeln!(
        out,
        "                    <token name=\"EasingStyle\">{}</token>",
        pose.easing_style
    );
    let _ = writeln!(
        out,
        "                    <string name=\"Name\">{}</string>",
        escape_text(&pose.part)
    );
    let _ = writeln!(
        out,
        "                    <float name=\"Weight\">{}</float>",
        format_number(pose.weight)
    );
    out.push_str("                </Properties>\n");
    out.push_str("            </Item>\n");
}

/// Shortest round-trip decimal form of `value`; negative zero renders as `0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Escape XML special characters in text content
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
