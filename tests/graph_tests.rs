use ndarray::{array, Array1};
use neuroray::SynapseGraph;

/// 0 → 1 → 2 → 3 chain with a 2 → 1 back edge (ids: 0 input, 3 output).
fn chain_with_cycle() -> SynapseGraph {
    // entries sorted by row * 4 + col: (1,0)=4, (1,2)=6, (2,1)=9, (3,2)=14
    let rows = array![1i64, 1, 2, 3];
    let cols = array![0i64, 2, 1, 2];
    let values = Array1::from_elem(4, 0.5f32);
    SynapseGraph::new(values, rows, cols, 4).unwrap()
}

#[test]
fn test_new_rejects_unsorted_coo() {
    let rows = array![2i64, 1];
    let cols = array![1i64, 0];
    let values = Array1::from_elem(2, 1.0f32);
    assert!(SynapseGraph::new(values, rows, cols, 4).is_err());
}

#[test]
fn test_new_rejects_self_loops_and_out_of_range() {
    let values = Array1::from_elem(1, 1.0f32);
    assert!(SynapseGraph::new(values.clone(), array![2i64], array![2i64], 4).is_err());
    assert!(SynapseGraph::new(values, array![5i64], array![0i64], 4).is_err());
}

#[test]
fn test_traverse_forward_frontier_walk() {
    let graph = chain_with_cycle();
    assert_eq!(graph.traverse_forward(&array![0i64], 1).unwrap(), array![1i64]);
    assert_eq!(graph.traverse_forward(&array![0i64], 2).unwrap(), array![2i64]);
    // node 2 feeds both the back edge into 1 and the output
    assert_eq!(
        graph.traverse_forward(&array![0i64], 3).unwrap(),
        array![1i64, 3]
    );
    // 3 has no successors: the frontier stays put
    assert_eq!(graph.traverse_forward(&array![3i64], 2).unwrap(), array![3i64]);
}

#[test]
fn test_traverse_backward_frontier_walk() {
    let graph = chain_with_cycle();
    assert_eq!(graph.traverse_backward(&array![3i64], 1).unwrap(), array![2i64]);
    assert_eq!(graph.traverse_backward(&array![3i64], 2).unwrap(), array![1i64]);
    // predecessors of 1 are 0 and 2
    assert_eq!(
        graph.traverse_backward(&array![3i64], 3).unwrap(),
        array![0i64, 2]
    );
}

#[test]
fn test_forward_backward_symmetry() {
    let graph = chain_with_cycle();
    let depth = 3;
    // backward from 3 reaches 0 within depth, so forward from 0 reaches 3
    let back = graph.traverse_backward(&array![3i64], depth).unwrap();
    assert!(back.iter().any(|&v| v == 0));
    let fwd = graph.traverse_forward(&array![0i64], depth).unwrap();
    assert!(fwd.iter().any(|&v| v == 3));
}

#[test]
fn test_check_connected() {
    let graph = chain_with_cycle();
    assert!(graph.check_connected(&array![0i64], &array![3i64], 3).unwrap());
    // two steps fall short of the output
    assert!(!graph.check_connected(&array![0i64], &array![3i64], 2).unwrap());
}

#[test]
fn test_delete_loops_breaks_hidden_cycle() {
    let mut graph = chain_with_cycle();
    graph.delete_loops(&array![3i64], &array![0i64], 3).unwrap();

    // exactly the 2 → 1 back edge dies; the forward chain survives
    assert_eq!(*graph.row_idx(), array![1i64, 2, 3]);
    assert_eq!(*graph.col_idx(), array![0i64, 1, 2]);

    // connectivity is preserved and the output no longer walks anywhere
    assert!(graph.check_connected(&array![0i64], &array![3i64], 3).unwrap());
    let from_output = graph.traverse_forward(&array![3i64], 3).unwrap();
    assert!(!from_output.iter().any(|&v| v == 0));
}

#[test]
fn test_delete_loops_removes_output_back_edge() {
    // chain plus edges 3 → 1 and 2 → 1 looping back from downstream
    // sorted keys over neuron_size 4: (1,0)=4, (1,2)=6, (1,3)=7, (2,1)=9, (3,2)=14
    let rows = array![1i64, 1, 1, 2, 3];
    let cols = array![0i64, 2, 3, 1, 2];
    let values = Array1::from_elem(5, 1.0f32);
    let mut graph = SynapseGraph::new(values, rows, cols, 4).unwrap();

    graph.delete_loops(&array![3i64], &array![0i64], 3).unwrap();

    assert_eq!(*graph.row_idx(), array![1i64, 2, 3]);
    assert_eq!(*graph.col_idx(), array![0i64, 1, 2]);
    assert!(graph.check_connected(&array![0i64], &array![3i64], 3).unwrap());

    // no path of length <= 3 from the output back to the input remains
    for depth in 1..=3 {
        let reach = graph.traverse_forward(&array![3i64], depth).unwrap();
        assert!(!reach.iter().any(|&v| v == 0));
    }
}

#[test]
fn test_delete_loops_keeps_acyclic_graph_intact() {
    let rows = array![1i64, 2, 3];
    let cols = array![0i64, 1, 2];
    let values = array![0.1f32, 0.2, 0.3];
    let mut graph = SynapseGraph::new(values, rows, cols, 4).unwrap();

    graph.delete_loops(&array![3i64], &array![0i64], 3).unwrap();

    assert_eq!(*graph.row_idx(), array![1i64, 2, 3]);
    assert_eq!(*graph.col_idx(), array![0i64, 1, 2]);
    assert_eq!(*graph.values(), array![0.1f32, 0.2, 0.3]);
}
