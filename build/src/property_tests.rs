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

use proptest::prelude::*;

use super::{check, CheckError, Dirtiness};
use protoc_paths::{memory::MemoryDisk, NodeCache};
use protoc_scan::{DependencyResult, FeatureSet, SearchRoots};
use protoc_tasks::{plan, synthesize, Configuration, FlagPolicy, TaskGenerator};

// `None` means the file does not exist.
fn mtime_strategy() -> impl Strategy<Value = Option<u64>> {
    prop_oneof![
        1 => Just(None),
        4 => (0u64..100).prop_map(Some),
    ]
}

const OUTPUTS: [&str; 3] = ["/p/build/a.pb.cc", "/p/build/a.pb.h", "/p/build/a_pb2.py"];

proptest! {
    #[test]
    fn check_matches_oldest_output_rule(
        input in mtime_strategy(),
        outputs in proptest::collection::vec(mtime_strategy(), 3),
        deps in proptest::collection::vec(0u64..100, 0..5),
    ) {
        let mut cache = NodeCache::new("/p", "/p/build");
        let features: FeatureSet = "cxx py".parse().unwrap();
        let source = cache.source("a.proto").unwrap();
        let mut generator = TaskGenerator::new("app", features.clone());
        let env = Configuration::new("protoc").env(FlagPolicy::PerFile);
        let plan = plan(&mut cache, source, &features).unwrap();
        let task = synthesize(&cache, &mut generator, &plan, &env, SearchRoots::default())
            .unwrap();

        let mut disk = MemoryDisk::new();
        if let Some(t) = input {
            disk.touch("/p/a.proto", t);
        }
        for (path, mtime) in OUTPUTS.iter().zip(outputs.iter()) {
            if let Some(t) = mtime {
                disk.touch(*path, *t);
            }
        }
        let mut result = DependencyResult::default();
        for (i, t) in deps.iter().enumerate() {
            let name = format!("dep{}.proto", i);
            disk.touch(format!("/p/{}", name), *t);
            result.nodes.push(cache.source(&name).unwrap());
        }

        let checked = check(&task, &result, &cache, &disk);
        let input = match input {
            Some(t) => t,
            None => {
                prop_assert!(
                    matches!(checked, Err(CheckError::MissingInput { .. })),
                    "missing input gave {:?}",
                    checked
                );
                return Ok(());
            }
        };
        let checked = checked.unwrap();
        if outputs.iter().any(Option::is_none) {
            prop_assert!(
                matches!(checked, Dirtiness::OutputMissing(_)),
                "missing output gave {:?}",
                checked
            );
            return Ok(());
        }
        let oldest = outputs.iter().flatten().min().copied().unwrap();
        let stale = input > oldest || deps.iter().any(|t| *t > oldest);
        prop_assert_eq!(checked.is_dirty(), stale);
        if let Dirtiness::Newer(node) = checked {
            prop_assert!(
                node == task.input || result.nodes.contains(&node),
                "{:?} blamed but not an input",
                node
            );
        }
    }
}
