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

//! Turns schema files of a task generator into compiler tasks.
//!
//! Planning decides which files one schema produces, the invocation environment decides which
//! flags the compiler gets, and synthesis binds both to a [`Task`] that carries its own import
//! scanner.

use protoc_scan::{FeatureSet, ResolveError};
use thiserror::Error;

mod config;
mod env;
mod generator;
mod manifest;
mod plan;
mod task;

pub use config::{Configuration, FlagTemplate, UseLib, USELIB};
pub use env::{FlagPolicy, FlagPolicyError, InvocationEnv};
pub use generator::{process_schema, TaskGenerator};
pub use manifest::{escape, manifest};
pub use plan::{plan, ArtifactPlan, OutputKind, PlannedOutput};
pub use task::{synthesize, Invocation, Task};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("feature {0} not supported by protoc")]
    UnsupportedFeatures(FeatureSet),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("quoting the protoc command line")]
    Quote(#[from] shlex::QuoteError),
}

/// Tasks in the order their schemas were processed.
#[derive(Debug, Default)]
pub struct Tasks {
    tasks: Vec<Task>,
}

impl Tasks {
    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn extend(&mut self, other: Tasks) {
        self.tasks.extend(other.tasks);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}

impl<'a> IntoIterator for &'a Tasks {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
