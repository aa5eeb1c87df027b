//! Structured mesh and DOF bookkeeping for the rectangular design domain.
//!
//! The domain is an `nx` x `ny` grid of unit-square Q4 elements. Nodes are
//! numbered column-major over the `(ny+1) x (nx+1)` node grid (the index
//! grows fastest down a column), elements column-major over the element
//! grid, and every node carries two displacement DOFs. Everything here is
//! built exactly once and never rebuilt during optimization: connectivity,
//! the canonical lower-triangular sparsity pattern of the global stiffness
//! matrix, and the free/fixed DOF partition.

use crate::element::{TRIANGLE_COLS, TRIANGLE_ROWS};
use crate::error::{Result, SolverError};

/// Displacement components per node.
pub const DOFS_PER_NODE: usize = 2;

/// Mesh topology, sparsity pattern and DOF partition.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub num_elements_x: usize,
    pub num_elements_y: usize,
    pub num_elements: usize,
    pub num_nodes_x: usize,
    pub num_nodes_y: usize,
    pub num_nodes: usize,
    pub num_dofs: usize,
    /// Global DOF indices of each element's four corners, counter-clockwise,
    /// two DOFs per corner.
    pub connectivity: Vec<[usize; 8]>,
    /// One `(row, col)` pair per (element, stencil-entry) combination with
    /// `row >= col`; 36 entries per element, element-major. The assembler
    /// relies on this canonical half-pattern with duplicates summed.
    pub stiffness_pattern: Vec<(usize, usize)>,
    /// Ascending indices of the DOFs solved for.
    pub free_dofs: Vec<usize>,
    /// Position of each DOF in `free_dofs`, `None` for fixed DOFs.
    pub dof_to_free: Vec<Option<usize>>,
}

impl Mesh {
    /// Build the mesh for an `nx` x `ny` element grid.
    ///
    /// The boundary conditions are the half-beam load case: the horizontal
    /// DOF of every left-edge node is fixed (symmetry plane) together with
    /// the vertical DOF of the bottom-right node (roller support).
    pub fn new(num_elements_x: usize, num_elements_y: usize) -> Result<Self> {
        if num_elements_x == 0 || num_elements_y == 0 {
            return Err(SolverError::InvalidMesh(num_elements_x, num_elements_y));
        }

        let num_elements = num_elements_x * num_elements_y;
        let num_nodes_x = num_elements_x + 1;
        let num_nodes_y = num_elements_y + 1;
        let num_nodes = num_nodes_x * num_nodes_y;
        let num_dofs = num_nodes * DOFS_PER_NODE;

        // Counter-clockwise corner traversal starting at the bottom-left
        // corner of the element, expressed as offsets from the first DOF of
        // its top-left node.
        let column_stride = DOFS_PER_NODE * num_nodes_y;
        let offsets: [usize; 8] = [
            2,
            3,
            column_stride + 2,
            column_stride + 3,
            column_stride,
            column_stride + 1,
            0,
            1,
        ];

        let mut connectivity = Vec::with_capacity(num_elements);
        for ex in 0..num_elements_x {
            for ey in 0..num_elements_y {
                let top_left_node = ex * num_nodes_y + ey;
                let base = DOFS_PER_NODE * top_left_node;
                let mut dofs = [0usize; 8];
                for (dof, offset) in dofs.iter_mut().zip(offsets.iter()) {
                    *dof = base + offset;
                }
                connectivity.push(dofs);
            }
        }

        let mut stiffness_pattern = Vec::with_capacity(36 * num_elements);
        for dofs in &connectivity {
            for k in 0..36 {
                let gi = dofs[TRIANGLE_ROWS[k]];
                let gj = dofs[TRIANGLE_COLS[k]];
                stiffness_pattern.push((gi.max(gj), gi.min(gj)));
            }
        }

        let mut fixed = vec![false; num_dofs];
        for node in 0..num_nodes_y {
            fixed[DOFS_PER_NODE * node] = true;
        }
        fixed[num_dofs - 1] = true;

        let mut free_dofs = Vec::with_capacity(num_dofs);
        let mut dof_to_free = vec![None; num_dofs];
        for dof in 0..num_dofs {
            if !fixed[dof] {
                dof_to_free[dof] = Some(free_dofs.len());
                free_dofs.push(dof);
            }
        }

        Ok(Self {
            num_elements_x,
            num_elements_y,
            num_elements,
            num_nodes_x,
            num_nodes_y,
            num_nodes,
            num_dofs,
            connectivity,
            stiffness_pattern,
            free_dofs,
            dof_to_free,
        })
    }

    /// The DOF carrying the external unit load: the vertical DOF of the
    /// top-left node.
    pub fn load_dof(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_grids() {
        assert!(matches!(Mesh::new(0, 4), Err(SolverError::InvalidMesh(0, 4))));
        assert!(matches!(Mesh::new(4, 0), Err(SolverError::InvalidMesh(4, 0))));
    }

    #[test]
    fn counts_for_two_by_one_grid() {
        let mesh = Mesh::new(2, 1).unwrap();
        assert_eq!(mesh.num_elements, 2);
        assert_eq!(mesh.num_nodes, 6);
        assert_eq!(mesh.num_dofs, 12);
        assert_eq!(mesh.free_dofs.len(), 12 - 3);
    }

    #[test]
    fn free_dof_count_formula() {
        for (nx, ny) in [(1, 1), (2, 1), (3, 2), (10, 4), (6, 6)] {
            let mesh = Mesh::new(nx, ny).unwrap();
            let expected = 2 * (ny + 1) * (nx + 1) - (ny + 1) - 1;
            assert_eq!(mesh.free_dofs.len(), expected, "grid {}x{}", nx, ny);
        }
    }

    #[test]
    fn pattern_is_canonical_and_in_range() {
        let mesh = Mesh::new(4, 3).unwrap();
        assert_eq!(mesh.stiffness_pattern.len(), 36 * mesh.num_elements);
        for &(row, col) in &mesh.stiffness_pattern {
            assert!(row >= col);
            assert!(row < mesh.num_dofs);
        }
    }

    #[test]
    fn dof_to_free_is_contiguous_enumeration() {
        let mesh = Mesh::new(5, 3).unwrap();
        for (position, &dof) in mesh.free_dofs.iter().enumerate() {
            assert_eq!(mesh.dof_to_free[dof], Some(position));
        }
        let fixed_count = mesh
            .dof_to_free
            .iter()
            .filter(|entry| entry.is_none())
            .count();
        assert_eq!(fixed_count, mesh.num_dofs - mesh.free_dofs.len());
        assert_eq!(fixed_count, mesh.num_nodes_y + 1);
    }

    #[test]
    fn connectivity_of_first_element() {
        // First element of a 2x1 grid: top-left node 0, nodes 0/1 in the
        // left column and 2/3 in the next. Counter-clockwise from the
        // bottom-left corner: nodes 1, 3, 2, 0.
        let mesh = Mesh::new(2, 1).unwrap();
        assert_eq!(mesh.connectivity[0], [2, 3, 6, 7, 4, 5, 0, 1]);
    }

    #[test]
    fn elements_are_column_major() {
        let mesh = Mesh::new(2, 2).unwrap();
        // Element 2 is the first element of the second column; its top-left
        // node is node 3 (second column of a 3-node-tall grid).
        assert_eq!(mesh.connectivity[2][6], 2 * 3);
    }

    #[test]
    fn load_dof_is_free() {
        let mesh = Mesh::new(3, 3).unwrap();
        assert!(mesh.dof_to_free[mesh.load_dof()].is_some());
    }
}
