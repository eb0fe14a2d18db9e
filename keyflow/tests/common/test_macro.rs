extern crate keyflow;

#[macro_export]
macro_rules! key_sequence_test {
    (keyboard: $keyboard:expr, sequence: [$([$row:expr, $col:expr, $pressed:expr, $at:expr]),* $(,)?], tick_to: $tick:expr, expected_reports: [$([$modifier:expr, $keys:expr]),* $(,)?]) => {
        let mut keyboard = $keyboard;
        let sequence = vec![
            $(
                $crate::common::TestKeyPress {
                    row: $row,
                    col: $col,
                    pressed: $pressed,
                    at: $at,
                },
            )*
        ];
        let expected_reports = $crate::key_report![$([$modifier, $keys]),*];

        $crate::common::run_key_sequence_test(&mut keyboard, &sequence, Some($tick), &expected_reports);
    };
    (keyboard: $keyboard:expr, sequence: [$([$row:expr, $col:expr, $pressed:expr, $at:expr]),* $(,)?], expected_reports: [$([$modifier:expr, $keys:expr]),* $(,)?]) => {
        let mut keyboard = $keyboard;
        let sequence = vec![
            $(
                $crate::common::TestKeyPress {
                    row: $row,
                    col: $col,
                    pressed: $pressed,
                    at: $at,
                },
            )*
        ];
        let expected_reports = $crate::key_report![$([$modifier, $keys]),*];

        $crate::common::run_key_sequence_test(&mut keyboard, &sequence, None, &expected_reports);
    };
}

// a rust macro to map a key name to its report byte
#[macro_export]
macro_rules! kc8 {
    ($key: ident) => {
        keyflow::keycode::KeyCode::$key as u8
    };
}

// a rust macro to create a key report that simulates key status change in hid
#[macro_export]
macro_rules! key_report {
    ($([$modifier:expr, $keys:expr]),* $(,)?) => {
        vec![
            $(
                keyflow::descriptor::KeyboardReport {
                    modifier: $modifier,
                    keycodes: $keys,
                    leds: 0,
                    reserved: 0,
                },
            )*
        ]
    };
}
