pub mod common;

use rusty_fork::rusty_fork_test;

use crate::common::create_test_keyboard;

rusty_fork_test! {
    #[test]
    fn test_momentary_layer_while_thumb_held() {
        key_sequence_test! {
            keyboard: create_test_keyboard(),
            sequence: [
                [3, 2, true, 0],    // Hold lt!(1, Space) past its term
                [4, 2, true, 300],  // U resolves as Up on the nav layer
                [4, 2, false, 350],
                [3, 2, false, 400],
            ],
            expected_reports: [
                [0, [kc8!(Up), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
            ]
        }
    }

    #[test]
    fn test_hold_on_other_press_commits_the_layer() {
        // The multi-behavior thumb commits as hold the moment another
        // key goes down, so fast layer taps never misfire
        key_sequence_test! {
            keyboard: create_test_keyboard(),
            sequence: [
                [7, 1, true, 0],
                [0, 0, true, 50],   // Q, immediately on the number layer
                [0, 0, false, 100],
                [7, 1, false, 150],
            ],
            expected_reports: [
                [0, [kc8!(Kc1), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
            ]
        }
    }

    #[test]
    fn test_tri_layer_activates_the_third_layer() {
        key_sequence_test! {
            keyboard: create_test_keyboard(),
            sequence: [
                [3, 2, true, 0],    // Nav layer held
                [7, 1, true, 300],  // Number layer on top
                [0, 0, true, 350],  // Both active: F1 from the tri layer
                [0, 0, false, 400],
                [7, 1, false, 450],
                [3, 2, false, 500],
            ],
            expected_reports: [
                [0, [kc8!(F1), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
            ]
        }
    }

    #[test]
    fn test_release_uses_the_cached_layer() {
        // The layer goes away before the key is released, the release
        // still undoes what the press registered
        key_sequence_test! {
            keyboard: create_test_keyboard(),
            sequence: [
                [3, 2, true, 0],
                [4, 0, true, 300],  // Left on the nav layer
                [3, 2, false, 350], // Nav layer off while Left is down
                [4, 0, false, 400],
            ],
            expected_reports: [
                [0, [kc8!(Left), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
            ]
        }
    }

    #[test]
    fn test_toggle_layer_latches_and_unlatches() {
        key_sequence_test! {
            keyboard: create_test_keyboard(),
            sequence: [
                [3, 2, true, 0],
                [6, 0, true, 300],   // tg!(2) on the nav layer
                [6, 0, false, 350],
                [3, 2, false, 400],
                [0, 0, true, 450],   // Number layer latched: Q types 1
                [0, 0, false, 500],
                [3, 2, true, 600],
                [6, 0, true, 900],   // Toggle it back off
                [6, 0, false, 950],
                [3, 2, false, 1000],
                [0, 0, true, 1050],  // Back on the base layer
                [0, 0, false, 1100],
            ],
            expected_reports: [
                [0, [kc8!(Kc1), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
                [0, [kc8!(Q), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
            ]
        }
    }

    #[test]
    fn test_default_layer_switch() {
        key_sequence_test! {
            keyboard: create_test_keyboard(),
            sequence: [
                [7, 1, true, 0],    // Number layer held
                [2, 1, true, 300],  // df!(1): nav becomes the default
                [2, 1, false, 350],
                [7, 1, false, 400],
                [4, 2, true, 450],  // Resolves on the new default layer
                [4, 2, false, 500],
            ],
            expected_reports: [
                [0, [kc8!(Up), 0, 0, 0, 0, 0]],
                [0, [0, 0, 0, 0, 0, 0]],
            ]
        }
    }
}
