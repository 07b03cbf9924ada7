//! Training all five sentence encoders on a toy treebank
//!
//! Run with: cargo run -p recursive-nets --example train_sentence_encoders
//! More detail: RUST_LOG=recursive_nets=debug cargo run ...
//!
//! This example demonstrates:
//! - Injecting a parser (a CoNLL-U treebank) and a tokenizer
//! - The forward ; loss ; backward ; update loop through `SentenceEncoder`
//! - Tree encoders taking one sentence, chain encoders taking a batch
//! - Saving a trained encoder and loading it back

use std::sync::Arc;

use recursive_diff::loss::squared_error;
use recursive_diff::Tensor;
use recursive_nets::{
    DependencyNetwork, HolographicNetwork, Lstm, NetConfig, NetError, RecurrentNetwork,
    SentenceEncoder, TreeLstm,
};
use recursive_nlp::{Treebank, Vocabulary, WhitespaceTokenizer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DIM: usize = 8;
const EPOCHS: usize = 40;

const TREEBANK: &str = "\
# text = the cat sat on the mat .
1\tthe\t_\t_\t_\t_\t2\tdet\t_\t_
2\tcat\t_\t_\t_\t_\t3\tnsubj\t_\t_
3\tsat\t_\t_\t_\t_\t0\tROOT\t_\t_
4\ton\t_\t_\t_\t_\t3\tprep\t_\t_
5\tthe\t_\t_\t_\t_\t6\tdet\t_\t_
6\tmat\t_\t_\t_\t_\t4\tpobj\t_\t_
7\t.\t_\t_\t_\t_\t3\tpunct\t_\t_

# text = dogs chase cats
1\tdogs\t_\t_\t_\t_\t2\tnsubj\t_\t_
2\tchase\t_\t_\t_\t_\t0\tROOT\t_\t_
3\tcats\t_\t_\t_\t_\t2\tdobj\t_\t_
";

/// A fixed target embedding per sentence.
fn target(i: usize) -> Tensor {
    Tensor::column(
        (0..DIM)
            .map(|d| if (d + i) % 2 == 0 { 0.5 } else { -0.5 })
            .collect(),
    )
}

fn train_tree<E: SentenceEncoder<Input = str>>(
    name: &str,
    net: &mut E,
    sentences: &[&str],
) -> Result<(), NetError> {
    for epoch in 0..EPOCHS {
        let mut total = 0.0;
        for (i, sentence) in sentences.iter().enumerate() {
            net.forward_pass(sentence)?;
            let loss = squared_error(net.root_embedding()?, &target(i));
            total += loss.cost;
            net.backward_pass(&loss.grad, E::DEFAULT_RATE)?;
        }
        if epoch % 10 == 0 || epoch == EPOCHS - 1 {
            println!("  {:<12} epoch {:>2}: cost = {:.4}", name, epoch, total);
        }
    }
    Ok(())
}

fn train_chain<E: SentenceEncoder<Input = [String]>>(
    name: &str,
    net: &mut E,
    batch: &[String],
) -> Result<(), NetError> {
    let mut targets = Tensor::zeros(DIM, batch.len());
    for i in 0..batch.len() {
        targets.set_column(i, &target(i));
    }
    for epoch in 0..EPOCHS {
        net.forward_pass(batch)?;
        let loss = squared_error(net.root_embedding()?, &targets);
        net.backward_pass(&loss.grad, E::DEFAULT_RATE)?;
        if epoch % 10 == 0 || epoch == EPOCHS - 1 {
            println!("  {:<12} epoch {:>2}: cost = {:.4}", name, epoch, loss.cost);
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recursive_nets=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Recursive Sentence Encoders ===\n");

    // -------------------------------------------------------------------------
    // 1. Collaborators
    // -------------------------------------------------------------------------
    println!("1. Collaborators");
    println!("----------------");
    let treebank = Arc::new(Treebank::from_conllu(TREEBANK)?);
    let vocab = Vocabulary::from_treebank(&treebank);
    println!("Treebank: {} sentences, {} words", treebank.len(), vocab.len());
    println!();

    let config = NetConfig::new(DIM).with_seed(42);
    let sentences = ["the cat sat on the mat .", "dogs chase cats"];

    // -------------------------------------------------------------------------
    // 2. Tree encoders: one parse per call
    // -------------------------------------------------------------------------
    println!("2. Tree encoders");
    println!("----------------");
    let mut tied = DependencyNetwork::new(config.clone(), vocab.as_slice(), treebank.clone())?;
    train_tree("tied", &mut tied, &sentences)?;
    let mut holo = HolographicNetwork::new(config.clone(), vocab.as_slice(), treebank.clone())?;
    train_tree("holographic", &mut holo, &sentences)?;
    let mut tree_lstm = TreeLstm::new(config.clone(), vocab.as_slice(), treebank.clone())?;
    train_tree("tree-lstm", &mut tree_lstm, &sentences)?;
    println!();

    // -------------------------------------------------------------------------
    // 3. Chain encoders: a left-padded batch per call
    // -------------------------------------------------------------------------
    println!("3. Chain encoders");
    println!("-----------------");
    let batch: Vec<String> = sentences.iter().map(|s| s.to_string()).collect();
    let mut rnn = RecurrentNetwork::new(config.clone(), vocab.as_slice(), Arc::new(WhitespaceTokenizer))?;
    train_chain("rnn", &mut rnn, &batch)?;
    let mut lstm = Lstm::new(config, vocab.as_slice(), Arc::new(WhitespaceTokenizer))?;
    train_chain("lstm", &mut lstm, &batch)?;
    println!();

    // -------------------------------------------------------------------------
    // 4. Persistence
    // -------------------------------------------------------------------------
    println!("4. Persistence");
    println!("--------------");
    let path = std::env::temp_dir().join("recursive_nets_tied.json");
    tied.save(&path)?;
    let mut reloaded = DependencyNetwork::load(&path, treebank)?;
    tied.forward_pass(sentences[1])?;
    reloaded.forward_pass(sentences[1])?;
    println!("Saved to {}", path.display());
    println!(
        "Reloaded embedding matches: {}",
        tied.root_embedding()? == reloaded.root_embedding()?
    );

    Ok(())
}
