use approx::assert_relative_eq;

use rust_nns::{
    Dataset, ErrorState, FeedforwardNetwork, FixedWeights, MultilayerPerceptron, WeightInitializer,
};

// 2-2-1 logistic network, bias last in each row.
fn reference_network() -> MultilayerPerceptron {
    let mut net = MultilayerPerceptron::new(&[2, 2, 1]).unwrap();
    FixedWeights::new(vec![
        vec![vec![-4.8, 4.6, -2.6], vec![5.1, -5.2, -3.2]],
        vec![vec![5.9, 5.2, -2.7]],
    ])
    .initialize_weights(&mut net);
    net
}

fn xor() -> Dataset {
    Dataset::from_pairs([
        (vec![0.0, 0.0], vec![0.0]),
        (vec![0.0, 1.0], vec![1.0]),
        (vec![1.0, 0.0], vec![1.0]),
        (vec![1.0, 1.0], vec![0.0]),
    ])
}

#[test]
fn forward_pass_matches_reference_values() {
    let mut net = reference_network();
    assert!(net.compute_output(&[0.0, 1.0]));

    assert_relative_eq!(
        net.activation(1, 0),
        0.880_797_077_977_882_3,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        net.activation(1, 1),
        0.000_224_816_770_233_295_3,
        max_relative = 1e-9
    );
    assert_relative_eq!(
        net.output_activation(0),
        0.923_992_491_022_943_2,
        max_relative = 1e-12
    );
    // y(1 - y) of the output above, not the sigmoid applied to it a second time.
    assert_relative_eq!(
        net.activation_derivative(2, 0),
        0.070_230_367_556_159_4,
        max_relative = 1e-10
    );
}

#[test]
fn forward_pass_is_repeatable() {
    let mut net = reference_network();
    net.compute_output(&[0.0, 1.0]);
    let first = net.output().to_vec();
    net.compute_output(&[1.0, 1.0]);
    net.compute_output(&[0.0, 1.0]);
    assert_eq!(net.output(), first.as_slice());
}

#[test]
fn xor_epoch_error_and_gradient_match_reference_values() {
    let data = xor();
    let mut net = reference_network();
    let mut state = ErrorState::new(&mut net, &data);

    let error = state.compute_epoch_gradient();
    assert_relative_eq!(error, 0.011_877_126_287_687_771, max_relative = 1e-10);

    let expected = [
        (
            (0, 0),
            [
                -0.002_910_953_796_536_671_7,
                0.000_336_160_232_287_124_3,
                -0.003_709_249_911_222_839_8,
            ],
        ),
        (
            (0, 1),
            [
                0.008_075_569_995_438_063,
                -0.001_655_859_112_486_639_8,
                0.005_966_297_926_381_792,
            ],
        ),
        (
            (1, 0),
            [
                0.003_430_292_456_263_836_3,
                0.013_639_189_261_047_228,
                0.001_755_601_915_230_446,
            ],
        ),
    ];

    let gradient = state.gradient();
    for ((layer, neuron), row) in expected {
        for (connection, want) in row.into_iter().enumerate() {
            assert_relative_eq!(
                gradient[(layer, neuron, connection)],
                want,
                epsilon = 1e-12,
                max_relative = 1e-8
            );
        }
    }
}
