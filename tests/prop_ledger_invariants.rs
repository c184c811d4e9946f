// Copyright (c) 2026 Skyglow
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]

mod common;

use common::{alice, ctx, fields, harness};
use proptest::prelude::*;
use skyglow::core::{
    algebra::passthrough::PassthroughAlgebra,
    types::{ObservationId, RegionCode},
};
use std::collections::BTreeMap;

fn region_code() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["EU-1", "AS-2", "NA-3", "AF-4"]).prop_map(str::to_string)
}

proptest! {
    #[test]
    fn prop_ids_regions_and_averages(
        subs in prop::collection::vec((region_code(), 0u64..1_000_000), 1..40)
    ) {
        let mut h = harness();
        let mut sums: BTreeMap<String, u64> = BTreeMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for (i, (code, brightness)) in subs.iter().enumerate() {
            let id = h
                .exec
                .submit(&ctx(alice(), i as u64), fields(*brightness, 0, 0, 0), RegionCode::new(code.clone()))
                .unwrap();
            prop_assert_eq!(id, ObservationId(i as u64 + 1));
            *sums.entry(code.clone()).or_default() += *brightness;
            if !first_seen.contains(code) {
                first_seen.push(code.clone());
            }
        }

        let n = subs.len() as u64;
        prop_assert_eq!(h.exec.observation_count(), n);
        let registered: Vec<String> = h
            .exec
            .registered_regions()
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();
        prop_assert_eq!(registered, first_seen);

        for (code, sum) in &sums {
            let avg = h.exec.regional_average(&RegionCode::new(code.clone())).unwrap();
            prop_assert_eq!(PassthroughAlgebra::open(&avg).unwrap(), sum / n);
        }
    }

    #[test]
    fn prop_aggregate_is_integer_mean(values in prop::collection::vec(0u64..1_000_000_000, 1..30)) {
        let h = harness();
        let cts: Vec<_> = values.iter().map(|v| PassthroughAlgebra::encrypt(*v)).collect();
        let mean = h.exec.aggregate(&cts).unwrap();
        let expected = values.iter().sum::<u64>() / values.len() as u64;
        prop_assert_eq!(PassthroughAlgebra::open(&mean).unwrap(), expected);
    }

    #[test]
    fn prop_compare_matches_plaintext(a in any::<u64>(), b in any::<u64>()) {
        let h = harness();
        let r = h
            .exec
            .compare(&PassthroughAlgebra::encrypt(a), &PassthroughAlgebra::encrypt(b))
            .unwrap();
        prop_assert_eq!(PassthroughAlgebra::open_bool(&r).unwrap(), a > b);
    }
}
