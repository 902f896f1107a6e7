/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Decides which synthesized compiler tasks are out of date.

use std::path::PathBuf;

use thiserror::Error;

mod rebuilder;
pub use rebuilder::{check, Dirtiness, MTime};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(
        "'{}', needed by '{}', missing and no known rule to make it",
        .input.display(),
        .output.display()
    )]
    MissingInput { input: PathBuf, output: PathBuf },
    #[error("stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod property_tests;
