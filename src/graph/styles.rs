//! Per-group node styles. The hierarchy level of a node is looked up here by
//! its group key (lowercased first label).

/// Colours and hierarchy level of a node group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupStyle {
	/// Lowercased label the style applies to.
	pub group: &'static str,
	/// Hierarchy level; higher is closer to the root.
	pub level: u32,
	/// Border colour.
	pub border: &'static str,
	/// Fill colour.
	pub background: &'static str,
	/// Label colour.
	pub font: &'static str,
}

/// Style of groups without an entry.
pub const DEFAULT_STYLE: GroupStyle = GroupStyle {
	group: "",
	level: 0,
	border: "black",
	background: "lightgray",
	font: "black",
};

const GROUP_STYLES: &[GroupStyle] = &[
	GroupStyle {
		group: "problem",
		level: 4,
		border: "red",
		background: "white",
		font: "black",
	},
	GroupStyle {
		group: "observation",
		level: 3,
		border: "orange",
		background: "white",
		font: "black",
	},
	GroupStyle {
		group: "obs_instance",
		level: 2,
		border: "blue",
		background: "white",
		font: "black",
	},
	GroupStyle {
		group: "patient",
		level: 1,
		..DEFAULT_STYLE
	},
];

/// Style for `group`, or [`DEFAULT_STYLE`].
pub fn style_for(group: &str) -> &'static GroupStyle {
	GROUP_STYLES
		.iter()
		.find(|s| s.group == group)
		.unwrap_or(&DEFAULT_STYLE)
}

/// Hierarchy level of `group`.
pub fn level_for(group: &str) -> u32 {
	style_for(group).level
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_groups_fall_back_to_default() {
		assert_eq!(level_for("problem"), 4);
		assert_eq!(level_for("patient"), 1);
		assert_eq!(level_for("Problem"), 0);
		assert_eq!(level_for(""), 0);
		assert_eq!(style_for("patient").border, "black");
	}
}
