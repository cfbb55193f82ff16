// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod bit_vec;
pub mod chunked_queue;
pub mod options;
pub mod results_dumper;

/// Defines a newtyped `u32` index implementing [`bit_vec::Idx`].
///
/// Purpose: avoid mixing identifiers of different analysis domains while
/// keeping them cheap to copy and dense enough for bit-vector sets.
#[macro_export]
macro_rules! index_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::util::bit_vec::Idx for $name {
            #[inline]
            fn new(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

/// Initializes `env_logger` for embedding hosts and tests. Repeated calls
/// are harmless.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
