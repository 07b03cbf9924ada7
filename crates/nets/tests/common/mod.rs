//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use recursive_diff::{GradCheck, Tensor};
use recursive_nlp::{Treebank, Vocabulary};

pub const DIM: usize = 4;

/// Distinct entries checked per matrix.
pub const SAMPLES: usize = 25;

pub const CAT_ON_MAT: &str = "the cat sat on the mat .";
pub const BROWN_DOG: &str = "a small brown dog barked loudly";
pub const DOGS_CHASE: &str = "dogs chase cats";

pub const CORPUS: &str = "\
# text = the cat sat on the mat .
1\tthe\tthe\tDET\tDT\t_\t2\tdet\t_\t_
2\tcat\tcat\tNOUN\tNN\t_\t3\tnsubj\t_\t_
3\tsat\tsit\tVERB\tVBD\t_\t0\tROOT\t_\t_
4\ton\ton\tADP\tIN\t_\t3\tprep\t_\t_
5\tthe\tthe\tDET\tDT\t_\t6\tdet\t_\t_
6\tmat\tmat\tNOUN\tNN\t_\t4\tpobj\t_\t_
7\t.\t.\tPUNCT\t.\t_\t3\tpunct\t_\t_

# text = a small brown dog barked loudly
1\ta\ta\tDET\tDT\t_\t4\tdet\t_\t_
2\tsmall\tsmall\tADJ\tJJ\t_\t4\tamod\t_\t_
3\tbrown\tbrown\tADJ\tJJ\t_\t4\tamod\t_\t_
4\tdog\tdog\tNOUN\tNN\t_\t5\tnsubj\t_\t_
5\tbarked\tbark\tVERB\tVBD\t_\t0\tROOT\t_\t_
6\tloudly\tloudly\tADV\tRB\t_\t5\tadvmod\t_\t_

# text = dogs chase cats
1\tdogs\tdog\tNOUN\tNNS\t_\t2\tnsubj\t_\t_
2\tchase\tchase\tVERB\tVBP\t_\t0\tROOT\t_\t_
3\tcats\tcat\tNOUN\tNNS\t_\t2\tdobj\t_\t_
";

pub fn treebank() -> Arc<Treebank> {
    Arc::new(Treebank::from_conllu(CORPUS).unwrap())
}

pub fn vocab() -> Vec<String> {
    Vocabulary::from_treebank(&treebank()).as_slice().to_vec()
}

/// A fixed offset from `root`, so the error gradient stays small.
pub fn nearby_target(root: &Tensor) -> Tensor {
    let offsets = [0.3, -0.2, 0.1, 0.25];
    let shift = Tensor::from_data(
        root.rows,
        root.cols,
        (0..root.len()).map(|i| offsets[i % offsets.len()]).collect(),
    );
    root.sub(&shift)
}

/// Every index when there are at most [`SAMPLES`], otherwise [`SAMPLES`]
/// distinct ones.
pub fn sample_positions(len: usize, seed: u64) -> Vec<usize> {
    if len <= SAMPLES {
        return (0..len).collect();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    index::sample(&mut rng, len, SAMPLES).into_vec()
}

/// Compare `analytic` against central differences of `cost` at sampled
/// entries of the tensor `param` selects.
pub fn check_param<N>(
    net: &mut N,
    name: &str,
    analytic: &Tensor,
    param: fn(&mut N) -> &mut Tensor,
    mut cost: impl FnMut(&mut N) -> f64,
) {
    let check = GradCheck::default();
    assert_eq!(param(net).shape(), analytic.shape(), "{} shape", name);
    let seed = name.bytes().map(u64::from).sum();
    for index in sample_positions(analytic.len(), seed) {
        let value = param(net).data[index];
        let result = check.check(name, index, analytic.data[index], value, |v| {
            param(net).data[index] = v;
            cost(net)
        });
        param(net).data[index] = value;
        if let Err(e) = result {
            panic!("{}", e);
        }
    }
}
