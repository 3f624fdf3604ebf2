//! Generation-based auto layout.
//!
//! Generation 0 = no resolvable parent in the snapshot; otherwise
//! 1 + max(parent generations). The walk is iterative with an explicit
//! stack so cyclic parent data cannot blow the call stack; members on a
//! cycle fall back to generation 0 and the inconsistency is logged.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use super::types::MemberNode;

pub const GENERATION_SPACING: f64 = 150.0;
pub const TOP_MARGIN: f64 = 50.0;
pub const SIBLING_SPACING: f64 = 200.0;

/// Compute the generation of every node, index-aligned with the input.
pub fn generations(nodes: &[MemberNode]) -> Vec<u32> {
	let index: HashMap<&str, usize> = nodes
		.iter()
		.enumerate()
		.map(|(i, n)| (n.id.as_str(), i))
		.collect();

	let mut dangling = 0usize;
	let parents_of: Vec<Vec<usize>> = nodes
		.iter()
		.map(|node| {
			[&node.father_id, &node.mother_id]
				.into_iter()
				.flatten()
				.filter_map(|id| {
					let resolved = index.get(id.as_str()).copied();
					if resolved.is_none() {
						dangling += 1;
					}
					resolved
				})
				.collect()
		})
		.collect();
	if dangling > 0 {
		debug!("{dangling} parent reference(s) point outside the snapshot, edges skipped");
	}

	let mut memo: Vec<Option<u32>> = vec![None; nodes.len()];
	let mut in_progress = vec![false; nodes.len()];

	for start in 0..nodes.len() {
		if memo[start].is_some() {
			continue;
		}
		let mut stack = vec![start];
		in_progress[start] = true;

		while let Some(&current) = stack.last() {
			if memo[current].is_some() {
				in_progress[current] = false;
				stack.pop();
				continue;
			}

			let parents = &parents_of[current];
			let cycle = parents
				.iter()
				.any(|&p| memo[p].is_none() && in_progress[p] && p != current)
				|| parents.contains(&current);
			let unresolved = parents
				.iter()
				.copied()
				.find(|&p| memo[p].is_none() && !in_progress[p]);

			if cycle {
				warn!(
					"Cyclic parent references around member {}, assigning generation 0",
					nodes[current].id
				);
				memo[current] = Some(0);
				in_progress[current] = false;
				stack.pop();
			} else if let Some(parent) = unresolved {
				in_progress[parent] = true;
				stack.push(parent);
			} else {
				let generation = parents
					.iter()
					.filter_map(|&p| memo[p])
					.max()
					.map(|g| g + 1)
					.unwrap_or(0);
				memo[current] = Some(generation);
				in_progress[current] = false;
				stack.pop();
			}
		}
	}

	memo.into_iter().map(|g| g.unwrap_or(0)).collect()
}

/// Assign coordinates to every auto-positioned node: one horizontal band per
/// generation, members evenly spaced and centered on the view width.
/// Manually positioned nodes keep their coordinates verbatim.
pub fn apply_layout(nodes: &mut [MemberNode], width: f64) {
	let gens = generations(nodes);

	let mut bands: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
	for (i, node) in nodes.iter_mut().enumerate() {
		if !node.auto_positioned {
			continue;
		}
		node.y = gens[i] as f64 * GENERATION_SPACING + TOP_MARGIN;
		bands.entry(gens[i]).or_default().push(i);
	}

	for members in bands.values() {
		let start_x = (width - members.len() as f64 * SIBLING_SPACING) / 2.0;
		for (slot, &i) in members.iter().enumerate() {
			nodes[i].x = start_x + slot as f64 * SIBLING_SPACING;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(id: &str, father: Option<&str>, mother: Option<&str>) -> MemberNode {
		MemberNode {
			id: id.into(),
			name: id.into(),
			role: None,
			avatar_url: None,
			father_id: father.map(String::from),
			mother_id: mother.map(String::from),
			spouse_id: None,
			x: 0.0,
			y: 0.0,
			auto_positioned: true,
		}
	}

	#[test]
	fn orphans_are_generation_zero() {
		let nodes = vec![node("a", None, None), node("b", None, None)];
		assert_eq!(generations(&nodes), vec![0, 0]);
	}

	#[test]
	fn child_is_one_past_deepest_parent() {
		// c's father is generation 0, mother is generation 1.
		let nodes = vec![
			node("gf", None, None),
			node("f", None, None),
			node("m", Some("gf"), None),
			node("c", Some("f"), Some("m")),
		];
		assert_eq!(generations(&nodes), vec![0, 0, 1, 2]);
	}

	#[test]
	fn dangling_parent_counts_as_absent() {
		let nodes = vec![node("a", Some("missing"), None)];
		assert_eq!(generations(&nodes), vec![0]);
	}

	#[test]
	fn parent_cycle_terminates_with_finite_generations() {
		let nodes = vec![
			node("a", Some("b"), None),
			node("b", Some("a"), None),
			node("c", Some("a"), None),
		];
		let gens = generations(&nodes);
		// Every member ends up with a small finite generation.
		assert!(gens.iter().all(|&g| g <= 2));
		// The member where the cycle is detected gets the fallback.
		assert!(gens.contains(&0));
		// Downstream of the cycle still layers off its parent.
		assert_eq!(gens[2], gens[0] + 1);
	}

	#[test]
	fn self_parent_terminates() {
		let nodes = vec![node("a", Some("a"), None)];
		assert_eq!(generations(&nodes), vec![0]);
	}

	#[test]
	fn chain_lays_out_strictly_downward() {
		let mut nodes = vec![
			node("1", None, None),
			node("2", Some("1"), None),
			node("3", Some("2"), None),
		];
		apply_layout(&mut nodes, 1200.0);
		assert_eq!(generations(&nodes), vec![0, 1, 2]);
		assert!(nodes[0].y < nodes[1].y);
		assert!(nodes[1].y < nodes[2].y);
		// Single member per band sits centered.
		assert_eq!(nodes[0].x, (1200.0 - SIBLING_SPACING) / 2.0);
	}

	#[test]
	fn siblings_spread_evenly_around_center() {
		let mut nodes = vec![
			node("p", None, None),
			node("a", Some("p"), None),
			node("b", Some("p"), None),
			node("c", Some("p"), None),
		];
		apply_layout(&mut nodes, 1000.0);
		let xs: Vec<f64> = nodes[1..].iter().map(|n| n.x).collect();
		assert_eq!(xs[1] - xs[0], SIBLING_SPACING);
		assert_eq!(xs[2] - xs[1], SIBLING_SPACING);
		assert_eq!(xs[0], (1000.0 - 3.0 * SIBLING_SPACING) / 2.0);
	}

	#[test]
	fn manual_positions_survive_relayout() {
		let mut nodes = vec![node("p", None, None), node("c", Some("p"), None)];
		nodes[1].auto_positioned = false;
		nodes[1].x = 500.0;
		nodes[1].y = 500.0;

		apply_layout(&mut nodes, 1200.0);
		// Unrelated addition triggers recomputation; the pinned node must not move.
		nodes.push(node("d", Some("p"), None));
		apply_layout(&mut nodes, 1200.0);

		assert_eq!((nodes[1].x, nodes[1].y), (500.0, 500.0));
	}
}
