/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

#[macro_export]
macro_rules! event {
    ($event:ident($($param:expr),* $(,)?) $(, $key:ident = $value:expr)* $(,)?) => {{
        let et = $crate::EventType::$event($($param),*);
        if et.level() != $crate::Level::Disable {
            $crate::Event::with_keys(
                et,
                vec![$(($crate::Key::$key, $crate::Value::from($value))),*],
            )
            .send();
        }
    }};
}

#[macro_export]
macro_rules! error {
    ($err:expr $(,)?) => {{
        let err: $crate::Error = $err;
        err.send();
    }};
}

#[macro_export]
macro_rules! location {
    () => {{ concat!(file!(), ":", line!(), " (", module_path!(), ")") }};
}

#[macro_export]
macro_rules! bail {
    ($err:expr $(,)?) => {
        return Err($err);
    };
}
