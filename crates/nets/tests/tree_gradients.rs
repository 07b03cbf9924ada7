//! Analytic tree gradients against central differences.

mod common;

use common::*;
use recursive_diff::loss::squared_error;
use recursive_diff::Tensor;
use recursive_nets::cells::TreeLstmGrads;
use recursive_nets::{
    DependencyNetwork, HolographicNetwork, NetConfig, PassGradients, TreeCell, TreeLstm,
    TreeNetwork,
};

fn network<C: TreeCell>(seed: u64) -> TreeNetwork<C> {
    TreeNetwork::new(NetConfig::new(DIM).with_seed(seed), &vocab(), treebank()).unwrap()
}

fn tree_cost<C: TreeCell>(net: &mut TreeNetwork<C>, sentence: &str, target: &Tensor) -> f64 {
    net.forward_pass(sentence).unwrap();
    squared_error(net.root_embedding().unwrap(), target).cost
}

/// Target near the current root, and the gradients of one backward pass
/// at rate zero.
fn analytic<C: TreeCell>(net: &mut TreeNetwork<C>, sentence: &str) -> (Tensor, PassGradients<C::Grads>) {
    net.forward_pass(sentence).unwrap();
    let target = nearby_target(net.root_embedding().unwrap());
    let loss = squared_error(net.root_embedding().unwrap(), &target);
    net.backward_pass(&loss.grad, 0.0).unwrap();
    assert!(!net.clipped(), "gradient check needs unclipped gradients");
    (target, net.last_gradients().unwrap().clone())
}

// ============================================================================
// Tied dependency network
// ============================================================================

fn structure(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().structure
}

fn det_weight(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("det").unwrap().weight
}

fn det_bias(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("det").unwrap().bias
}

fn nsubj_weight(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("nsubj").unwrap().weight
}

fn pobj_weight(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("pobj").unwrap().weight
}

fn prep_weight(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("prep").unwrap().weight
}

fn punct_bias(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("punct").unwrap().bias
}

fn amod_weight(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("amod").unwrap().weight
}

fn tied_amod_bias(net: &mut DependencyNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("amod").unwrap().bias
}

fn tied_the(net: &mut DependencyNetwork) -> &mut Tensor {
    net.embeddings_mut().get_mut("the").unwrap()
}

fn tied_cat(net: &mut DependencyNetwork) -> &mut Tensor {
    net.embeddings_mut().get_mut("cat").unwrap()
}

#[test]
fn test_tied_gradients() {
    let mut net: DependencyNetwork = network(21);
    let (target, grads) = analytic(&mut net, CAT_ON_MAT);
    let cost = |n: &mut DependencyNetwork| tree_cost(n, CAT_ON_MAT, &target);

    check_param(&mut net, "W_m", &grads.params.structure, structure, cost);
    let roles = &grads.params.roles;
    check_param(&mut net, "det.W", roles.weight_sum("det").unwrap(), det_weight, cost);
    check_param(&mut net, "det.b", roles.bias_sum("det").unwrap(), det_bias, cost);
    check_param(&mut net, "nsubj.W", roles.weight_sum("nsubj").unwrap(), nsubj_weight, cost);
    check_param(&mut net, "pobj.W", roles.weight_sum("pobj").unwrap(), pobj_weight, cost);
    check_param(&mut net, "prep.W", roles.weight_sum("prep").unwrap(), prep_weight, cost);
    check_param(&mut net, "punct.b", roles.bias_sum("punct").unwrap(), punct_bias, cost);
    check_param(&mut net, "x[the]", grads.words.get("the").unwrap(), tied_the, cost);
    check_param(&mut net, "x[cat]", grads.words.get("cat").unwrap(), tied_cat, cost);
}

#[test]
fn test_tied_gradients_with_repeated_role() {
    let mut net: DependencyNetwork = network(24);
    let (target, grads) = analytic(&mut net, BROWN_DOG);
    let cost = |n: &mut DependencyNetwork| tree_cost(n, BROWN_DOG, &target);

    let roles = &grads.params.roles;
    assert_eq!(roles.count("amod"), 2);
    check_param(&mut net, "W_m", &grads.params.structure, structure, cost);
    check_param(&mut net, "amod.W", roles.weight_sum("amod").unwrap(), amod_weight, cost);
    check_param(&mut net, "amod.b", roles.bias_sum("amod").unwrap(), tied_amod_bias, cost);
}

// ============================================================================
// Holographic network
// ============================================================================

fn amod_bias(net: &mut HolographicNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("amod").unwrap().bias
}

fn holo_nsubj_bias(net: &mut HolographicNetwork) -> &mut Tensor {
    &mut net.cell_mut().roles.get_mut("nsubj").unwrap().bias
}

fn holo_small(net: &mut HolographicNetwork) -> &mut Tensor {
    net.embeddings_mut().get_mut("small").unwrap()
}

fn holo_barked(net: &mut HolographicNetwork) -> &mut Tensor {
    net.embeddings_mut().get_mut("barked").unwrap()
}

#[test]
fn test_holographic_gradients() {
    let mut net: HolographicNetwork = network(22);
    let (target, grads) = analytic(&mut net, BROWN_DOG);
    let cost = |n: &mut HolographicNetwork| tree_cost(n, BROWN_DOG, &target);

    assert_eq!(grads.params.count("amod"), 2);
    assert!(grads.params.weight_sum("amod").is_none());
    check_param(&mut net, "amod.b", grads.params.bias_sum("amod").unwrap(), amod_bias, cost);
    check_param(&mut net, "nsubj.b", grads.params.bias_sum("nsubj").unwrap(), holo_nsubj_bias, cost);
    check_param(&mut net, "x[small]", grads.words.get("small").unwrap(), holo_small, cost);
    check_param(&mut net, "x[barked]", grads.words.get("barked").unwrap(), holo_barked, cost);
}

// ============================================================================
// Tree-LSTM
// ============================================================================

fn input_w(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().input.w
}

fn input_u(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().input.u
}

fn input_b(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().input.b
}

fn forget_w(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().forget.w
}

fn forget_u(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().forget.u
}

fn forget_b(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().forget.b
}

fn output_w(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().output.w
}

fn output_u(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().output.u
}

fn output_b(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().output.b
}

fn candidate_w(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().candidate.w
}

fn candidate_u(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().candidate.u
}

fn candidate_b(net: &mut TreeLstm) -> &mut Tensor {
    &mut net.cell_mut().candidate.b
}

fn lstm_the(net: &mut TreeLstm) -> &mut Tensor {
    net.embeddings_mut().get_mut("the").unwrap()
}

fn lstm_mat(net: &mut TreeLstm) -> &mut Tensor {
    net.embeddings_mut().get_mut("mat").unwrap()
}

/// Every gate matrix and bias of the tree-LSTM on one sentence.
fn check_tree_lstm(seed: u64, sentence: &str) -> (TreeLstm, Tensor, PassGradients<TreeLstmGrads>) {
    let mut net: TreeLstm = network(seed);
    let (target, grads) = analytic(&mut net, sentence);
    let cost = |n: &mut TreeLstm| tree_cost(n, sentence, &target);
    let g = &grads.params;

    check_param(&mut net, "input.w", &g.input.w, input_w, cost);
    check_param(&mut net, "input.u", &g.input.u, input_u, cost);
    check_param(&mut net, "input.b", &g.input.b, input_b, cost);
    check_param(&mut net, "forget.w", &g.forget.w, forget_w, cost);
    check_param(&mut net, "forget.u", &g.forget.u, forget_u, cost);
    check_param(&mut net, "forget.b", &g.forget.b, forget_b, cost);
    check_param(&mut net, "output.w", &g.output.w, output_w, cost);
    check_param(&mut net, "output.u", &g.output.u, output_u, cost);
    check_param(&mut net, "output.b", &g.output.b, output_b, cost);
    check_param(&mut net, "candidate.w", &g.candidate.w, candidate_w, cost);
    check_param(&mut net, "candidate.u", &g.candidate.u, candidate_u, cost);
    check_param(&mut net, "candidate.b", &g.candidate.b, candidate_b, cost);
    (net, target, grads)
}

#[test]
fn test_tree_lstm_gradients() {
    let (mut net, target, grads) = check_tree_lstm(23, CAT_ON_MAT);
    let cost = |n: &mut TreeLstm| tree_cost(n, CAT_ON_MAT, &target);
    check_param(&mut net, "x[the]", grads.words.get("the").unwrap(), lstm_the, cost);
    check_param(&mut net, "x[mat]", grads.words.get("mat").unwrap(), lstm_mat, cost);
}

#[test]
fn test_tree_lstm_gradients_with_wide_node() {
    // "dog" has three children and "barked" two
    check_tree_lstm(25, BROWN_DOG);
}

#[test]
fn test_sampled_positions_are_distinct() {
    assert_eq!(sample_positions(4, 1), vec![0, 1, 2, 3]);
    let mut drawn = sample_positions(DIM * DIM * 4, 9);
    assert_eq!(drawn.len(), SAMPLES);
    drawn.sort_unstable();
    drawn.dedup();
    assert_eq!(drawn.len(), SAMPLES);
}
