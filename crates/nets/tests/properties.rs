//! Behavior shared by every encoder.

mod common;

use std::sync::Arc;

use common::*;
use recursive_core::{CoreError, Shape};
use recursive_diff::activations::tanh;
use recursive_diff::loss::squared_error;
use recursive_diff::Tensor;
use recursive_nets::{
    ChainCell, ChainNetwork, DependencyNetwork, HolographicNetwork, Lstm, NetConfig, NetError,
    RecurrentNetwork, SentenceEncoder, TreeLstm,
};
use recursive_nlp::{NlpError, Token, Treebank, WhitespaceTokenizer, DEPENDENCY_LABELS};

fn config() -> NetConfig {
    NetConfig::new(DIM).with_seed(7)
}

fn chain_batch() -> Vec<String> {
    vec![CAT_ON_MAT.to_string(), DOGS_CHASE.to_string(), BROWN_DOG.to_string()]
}

/// Every entry of `after` differs from `before`.
fn all_changed(name: &str, before: &Tensor, after: &Tensor) {
    for (i, (a, b)) in before.as_slice().iter().zip(after.as_slice()).enumerate() {
        assert_ne!(a, b, "{}[{}] did not move", name, i);
    }
}

// ============================================================================
// Output dimension
// ============================================================================

fn root_shape<E: SentenceEncoder<Input = str>>(net: &mut E) -> Shape {
    net.forward_pass(CAT_ON_MAT).unwrap();
    net.root_embedding().unwrap().shape()
}

#[test]
fn test_tree_embeddings_are_columns() {
    let expected = Shape::column(DIM);
    let mut tied = DependencyNetwork::new(config(), &vocab(), treebank()).unwrap();
    let mut holo = HolographicNetwork::new(config(), &vocab(), treebank()).unwrap();
    let mut lstm = TreeLstm::new(config(), &vocab(), treebank()).unwrap();
    assert_eq!(root_shape(&mut tied), expected);
    assert_eq!(root_shape(&mut holo), expected);
    assert_eq!(root_shape(&mut lstm), expected);
}

#[test]
fn test_chain_embeddings_have_one_column_per_sentence() {
    let tokenizer = Arc::new(WhitespaceTokenizer);
    let mut rnn = RecurrentNetwork::new(config(), &vocab(), tokenizer.clone()).unwrap();
    let mut lstm = Lstm::new(config(), &vocab(), tokenizer).unwrap();
    let batch = chain_batch();
    rnn.forward_pass(&batch).unwrap();
    lstm.forward_pass(&batch).unwrap();
    assert_eq!(rnn.root_embedding().unwrap().shape(), Shape::new(DIM, 3));
    assert_eq!(lstm.root_embedding().unwrap().shape(), Shape::new(DIM, 3));
}

// ============================================================================
// Every tied matrix moves after one update
// ============================================================================

#[test]
fn test_tied_update_moves_every_used_matrix() {
    let mut net = DependencyNetwork::new(config(), &vocab(), treebank()).unwrap();
    let before = net.cell().clone();
    net.forward_pass(CAT_ON_MAT).unwrap();
    net.backward_pass(&Tensor::filled(DIM, 1, 0.5), 0.1).unwrap();

    all_changed("W_m", &before.structure, &net.cell().structure);
    for role in ["det", "nsubj", "prep", "pobj", "punct"] {
        let old = before.roles.get(role).unwrap();
        let new = net.cell().roles.get(role).unwrap();
        all_changed(role, &old.weight, &new.weight);
        all_changed(role, &old.bias, &new.bias);
    }
    // roles absent from the sentence are untouched
    assert_eq!(before.roles.get("amod"), net.cell().roles.get("amod"));
}

#[test]
fn test_holographic_update_moves_biases_only() {
    let mut net = HolographicNetwork::new(config(), &vocab(), treebank()).unwrap();
    let before = net.cell().clone();
    net.forward_pass(BROWN_DOG).unwrap();
    net.backward_pass(&Tensor::filled(DIM, 1, 0.5), 0.1).unwrap();

    for role in ["det", "amod", "nsubj", "advmod"] {
        let old = before.roles.get(role).unwrap();
        let new = net.cell().roles.get(role).unwrap();
        assert_eq!(old.weight, new.weight, "{} binding is fixed", role);
        all_changed(role, &old.bias, &new.bias);
    }
}

#[test]
fn test_tree_lstm_update_moves_every_gate() {
    let mut net = TreeLstm::new(config(), &vocab(), treebank()).unwrap();
    let before = net.cell().clone();
    net.forward_pass(CAT_ON_MAT).unwrap();
    net.backward_pass(&Tensor::filled(DIM, 1, 0.5), 0.1).unwrap();
    let after = net.cell();

    for (name, old, new) in [
        ("input", &before.input, &after.input),
        ("forget", &before.forget, &after.forget),
        ("output", &before.output, &after.output),
        ("candidate", &before.candidate, &after.candidate),
    ] {
        all_changed(name, &old.w, &new.w);
        all_changed(name, &old.u, &new.u);
        all_changed(name, &old.b, &new.b);
    }
}

#[test]
fn test_rnn_update_moves_every_matrix() {
    let mut net = RecurrentNetwork::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    let before = net.cell().clone();
    let output_before = net.output_layer().clone();
    net.forward_pass(&chain_batch()).unwrap();
    net.backward_pass(&Tensor::filled(DIM, 3, 0.5), 0.1).unwrap();

    all_changed("W_hh", &before.whh, &net.cell().whh);
    all_changed("W_xh", &before.wxh, &net.cell().wxh);
    all_changed("b_h", &before.bh, &net.cell().bh);
    all_changed("W_y", &output_before.weight, &net.output_layer().weight);
    all_changed("b_y", &output_before.bias, &net.output_layer().bias);
}

#[test]
fn test_lstm_update_moves_every_gate() {
    let mut net = Lstm::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    let before = net.cell().clone();
    let output_before = net.output_layer().clone();
    net.forward_pass(&chain_batch()).unwrap();
    net.backward_pass(&Tensor::filled(DIM, 3, 0.5), 0.1).unwrap();
    let after = net.cell();

    for (name, old, new) in [
        ("input", &before.input, &after.input),
        ("forget", &before.forget, &after.forget),
        ("output", &before.output, &after.output),
        ("candidate", &before.candidate, &after.candidate),
    ] {
        all_changed(name, &old.w, &new.w);
        all_changed(name, &old.u, &new.u);
        all_changed(name, &old.b, &new.b);
    }
    all_changed("W_y", &output_before.weight, &net.output_layer().weight);
}

// ============================================================================
// Padding
// ============================================================================

/// A short sentence encodes the same alone and left-padded next to a long one.
fn assert_padding_is_invisible<C: ChainCell>(net: &mut ChainNetwork<C>) {
    net.forward_batch(&[DOGS_CHASE]).unwrap();
    let alone = net.output().unwrap().clone();

    net.forward_batch(&[CAT_ON_MAT, DOGS_CHASE]).unwrap();
    assert_eq!(net.batch().unwrap().seq_len(), 7);
    let padded = net.output().unwrap().column_at(1);
    let diff = padded.sub(&alone).norm();
    assert!(diff < 1e-12, "padding changed the embedding by {}", diff);
}

#[test]
fn test_lstm_padding_leaves_short_sentence_unchanged() {
    let mut net = Lstm::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    // gate biases start at 3.0 and 0.1, so an unmasked PAD step would move c
    assert!(net.cell().candidate.b.norm() > 0.0);
    assert_padding_is_invisible(&mut net);
}

#[test]
fn test_rnn_padding_leaves_short_sentence_unchanged() {
    let mut net = RecurrentNetwork::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    assert_padding_is_invisible(&mut net);

    let batch = chain_batch();
    for _ in 0..3 {
        net.forward_pass(&batch).unwrap();
        let loss = squared_error(net.output().unwrap(), &Tensor::filled(DIM, 3, 0.5));
        net.backward_pass(&loss.grad, RecurrentNetwork::DEFAULT_RATE).unwrap();
    }
    assert!(net.cell().bh.norm() > 0.0);
    assert_padding_is_invisible(&mut net);
}

#[test]
fn test_padded_steps_get_no_gradient() {
    // a zero error on the long sentence leaves only the padded one
    let mut alone = Lstm::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    let mut padded = Lstm::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    let err = Tensor::column(vec![0.1, -0.2, 0.05, 0.3]);

    alone.forward_batch(&[DOGS_CHASE]).unwrap();
    alone.backward_pass(&err, 0.0).unwrap();

    padded.forward_batch(&[CAT_ON_MAT, DOGS_CHASE]).unwrap();
    let mut two = Tensor::zeros(DIM, 2);
    two.set_column(1, &err);
    padded.backward_pass(&two, 0.0).unwrap();

    let a = &alone.last_gradients().unwrap().params.cell;
    let p = &padded.last_gradients().unwrap().params.cell;
    // batch means over B = 2 with one zero column halve the sums
    for (name, x, y) in [
        ("input.u", &a.input.u, &p.input.u),
        ("forget.b", &a.forget.b, &p.forget.b),
        ("candidate.w", &a.candidate.w, &p.candidate.w),
    ] {
        let diff = x.scale(0.5).sub(y).norm();
        assert!(diff < 1e-12, "{} differs by {}", name, diff);
    }
}

// ============================================================================
// Role normalization
// ============================================================================

#[test]
fn test_role_gradient_is_mean_over_uses() {
    let mut net = DependencyNetwork::new(config(), &vocab(), treebank()).unwrap();
    let before = net.cell().roles.get("det").unwrap().clone();
    net.forward_pass(CAT_ON_MAT).unwrap();
    let root = net.root_embedding().unwrap().clone();
    let loss = squared_error(&root, &Tensor::zeros(DIM, 1));
    let rate = 0.2;
    net.backward_pass(&loss.grad, rate).unwrap();

    // "the" heads two det edges
    let topology = net.topology().unwrap();
    let nodes = net.nodes();
    let mut expected_sum = Tensor::zeros(DIM, DIM);
    let mut uses = 0;
    for &i in topology.preorder() {
        if nodes[i].dep() != "det" {
            continue;
        }
        let parent = topology.parent(i).unwrap();
        let parent_delta = nodes[parent].grad.as_ref().unwrap();
        let h = nodes[i].state.as_ref().unwrap();
        expected_sum.add_assign(&Tensor::outer(parent_delta, h));
        uses += 1;
    }
    assert_eq!(uses, 2);

    let roles = &net.last_gradients().unwrap().params.roles;
    assert_eq!(roles.count("det"), 2);
    assert_eq!(roles.weight_sum("det").unwrap(), &expected_sum);

    let after = &net.cell().roles.get("det").unwrap().weight;
    let expected = before
        .weight
        .zip_map(&expected_sum, |w, g| w - rate * (g / 2.0));
    assert_eq!(after, &expected);
}

// ============================================================================
// cat sat
// ============================================================================

#[test]
fn test_cat_sat_with_identity_weights() {
    let mut treebank = Treebank::new();
    treebank
        .insert(
            "cat sat",
            Token::tree_from_heads(&["cat", "sat"], &[1, 1], &["nsubj", "ROOT"]).unwrap(),
        )
        .unwrap();
    let vocab = vec!["cat".to_string(), "sat".to_string()];
    let mut net = DependencyNetwork::new(NetConfig::new(4), &vocab, Arc::new(treebank)).unwrap();

    let cat = Tensor::column(vec![0.1, -0.2, 0.3, 0.05]);
    let sat = Tensor::column(vec![0.4, 0.0, -0.6, 0.2]);
    net.embeddings_mut().insert("cat", cat.clone()).unwrap();
    net.embeddings_mut().insert("sat", sat.clone()).unwrap();
    let cell = net.cell_mut();
    cell.structure = Tensor::identity(4);
    for label in DEPENDENCY_LABELS {
        let params = cell.roles.get_mut(label).unwrap();
        params.weight = Tensor::identity(4);
        params.bias = Tensor::zeros(4, 1);
    }

    net.forward_pass("cat sat").unwrap();
    // the child contributes its own embedding, tanh(I·cat)
    let child = tanh(&cat);
    let expected = tanh(&sat.add(&Tensor::identity(4).matmul(&child)));
    assert_eq!(net.root_embedding().unwrap(), &expected);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_cycle_is_rejected() {
    let mut net = DependencyNetwork::new(config(), &vocab(), treebank()).unwrap();
    let tokens = vec![
        Token::new(0, "dogs", 0, "ROOT"),
        Token::new(1, "chase", 2, "dep"),
        Token::new(2, "cats", 1, "dep"),
    ];
    let err = net.forward_tokens(tokens).unwrap_err();
    assert!(matches!(err, NetError::Core(CoreError::CyclicTree { .. })), "{:?}", err);
    assert!(matches!(net.root_embedding(), Err(NetError::NoForwardPass)));
}

#[test]
fn test_missing_and_multiple_roots_are_rejected() {
    let mut net = TreeLstm::new(config(), &vocab(), treebank()).unwrap();
    let no_root = vec![Token::new(0, "dogs", 1, "nsubj"), Token::new(1, "chase", 0, "dep")];
    assert!(matches!(
        net.forward_tokens(no_root),
        Err(NetError::Core(CoreError::MissingRoot))
    ));

    let two_roots = vec![Token::new(0, "dogs", 0, "ROOT"), Token::new(1, "chase", 1, "ROOT")];
    assert!(matches!(
        net.forward_tokens(two_roots),
        Err(NetError::Core(CoreError::MultipleRoots { first: 0, second: 1 }))
    ));
}

#[test]
fn test_unparsed_sentence() {
    let mut net = HolographicNetwork::new(config(), &vocab(), treebank()).unwrap();
    let err = net.forward_pass("colorless green ideas").unwrap_err();
    assert!(matches!(err, NetError::Nlp(NlpError::UnparsedSentence { .. })));
}

#[test]
fn test_backward_needs_forward() {
    let mut net = DependencyNetwork::new(config(), &vocab(), treebank()).unwrap();
    let err = net.backward_pass(&Tensor::zeros(DIM, 1), 0.1).unwrap_err();
    assert!(matches!(err, NetError::NoForwardPass));
}

#[test]
fn test_error_gradient_shape_is_checked() {
    let mut net = TreeLstm::new(config(), &vocab(), treebank()).unwrap();
    net.forward_pass(DOGS_CHASE).unwrap();
    let err = net.backward_pass(&Tensor::zeros(DIM + 1, 1), 0.1).unwrap_err();
    assert!(matches!(
        err,
        NetError::GradientShape { expected, got } if expected == Shape::column(DIM) && got == Shape::column(DIM + 1)
    ));
}

#[test]
fn test_empty_chain_batch() {
    let mut net = RecurrentNetwork::new(config(), &vocab(), Arc::new(WhitespaceTokenizer)).unwrap();
    let err = net.forward_pass(&[]).unwrap_err();
    assert!(matches!(err, NetError::EmptyBatch));
}

// ============================================================================
// Unknown words
// ============================================================================

#[test]
fn test_unknown_word_reads_zero_and_is_not_trained() {
    let small_vocab: Vec<String> = ["dogs", "chase"].iter().map(|w| w.to_string()).collect();
    let mut net = DependencyNetwork::new(config(), &small_vocab, treebank()).unwrap();
    net.forward_pass(DOGS_CHASE).unwrap();

    let cats = &net.nodes()[2];
    assert!(!cats.known);
    assert_eq!(cats.input, Tensor::zeros(DIM, 1));

    net.backward_pass(&Tensor::filled(DIM, 1, 0.3), 0.1).unwrap();
    let words = &net.last_gradients().unwrap().words;
    assert!(words.get("cats").is_none());
    assert!(words.get("dogs").is_some());
    assert!(!net.embeddings().contains("cats"));
}

#[test]
fn test_unseen_role_starts_at_zero() {
    let mut treebank = Treebank::new();
    treebank
        .insert(
            "dogs chase",
            Token::tree_from_heads(&["dogs", "chase"], &[1, 1], &["obl:agent", "ROOT"]).unwrap(),
        )
        .unwrap();
    let mut net = DependencyNetwork::new(config(), &vocab(), Arc::new(treebank)).unwrap();
    assert!(net.cell().roles.get("obl:agent").is_none());

    net.forward_pass("dogs chase").unwrap();
    let role = net.cell().roles.get("obl:agent").unwrap();
    assert_eq!(role.weight, Tensor::zeros(DIM, DIM));
    assert_eq!(role.bias, Tensor::zeros(DIM, 1));

    net.backward_pass(&Tensor::filled(DIM, 1, 0.3), 0.1).unwrap();
    assert_ne!(net.cell().roles.get("obl:agent").unwrap().bias, Tensor::zeros(DIM, 1));
}

#[test]
fn test_training_reduces_cost() {
    let mut net = DependencyNetwork::new(config(), &vocab(), treebank()).unwrap();
    let target = Tensor::column(vec![0.5, -0.5, 0.25, 0.0]);
    let mut costs = Vec::new();
    for _ in 0..30 {
        net.forward_pass(DOGS_CHASE).unwrap();
        let loss = squared_error(net.root_embedding().unwrap(), &target);
        costs.push(loss.cost);
        net.backward_pass(&loss.grad, DependencyNetwork::DEFAULT_RATE).unwrap();
    }
    assert!(costs[29] < costs[0], "cost went from {} to {}", costs[0], costs[29]);
}
