use infergate_core::{BackendOption, ShapeMap, TrtOption};
use infergate_predictor::config::DEFAULT_CPU_THREADS;
use infergate_predictor::{shape, AcceleratorBinder, ConfigBuilder};
use proptest::prelude::*;

fn shape_strategy(rank: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..64, rank)
}

fn shape_maps() -> impl Strategy<Value = (ShapeMap, ShapeMap, ShapeMap)> {
    prop::collection::btree_map("[a-z]{1,6}", 1usize..5, 0..5).prop_flat_map(|ranks| {
        let names: Vec<String> = ranks.keys().cloned().collect();
        let per_input: Vec<_> = ranks
            .values()
            .map(|rank| (shape_strategy(*rank), shape_strategy(*rank), shape_strategy(*rank)))
            .collect();
        per_input.prop_map(move |triples| {
            let mut min = ShapeMap::new();
            let mut max = ShapeMap::new();
            let mut opt = ShapeMap::new();
            for (name, (lo, hi, mid)) in names.iter().zip(triples) {
                min.insert(name.clone(), lo);
                max.insert(name.clone(), hi);
                opt.insert(name.clone(), mid);
            }
            (min, max, opt)
        })
    })
}

proptest! {
    #[test]
    fn cpu_fusion_thread_count_has_a_floor(threads in any::<i32>()) {
        let option = BackendOption {
            use_gpu: false,
            enable_mkldnn: true,
            cpu_thread_num: threads,
            ..BackendOption::default()
        };
        let config = ConfigBuilder::new(&option, AcceleratorBinder::Absent)
            .resolve("model.pdmodel", "model.pdiparams")
            .unwrap();
        prop_assert!(config.cpu_fusion.is_some());
        let expected = if threads > 0 { threads as usize } else { DEFAULT_CPU_THREADS };
        prop_assert_eq!(config.cpu_math_threads, expected);
    }

    #[test]
    fn complete_maps_always_derive((min, max, opt) in shape_maps()) {
        let trt = TrtOption {
            min_shape: min.clone(),
            max_shape: max,
            opt_shape: opt,
            ..TrtOption::default()
        };
        let ranges = shape::derive(&trt).unwrap();
        prop_assert!(ranges.min.keys().eq(min.keys()));
        prop_assert!(ranges.max.keys().eq(min.keys()));
        prop_assert!(ranges.opt.keys().eq(min.keys()));
    }

    #[test]
    fn dropping_a_bound_names_the_input(
        (min, max, opt) in shape_maps(),
        from_max in any::<bool>(),
    ) {
        prop_assume!(!min.is_empty());
        let victim = min.keys().next().unwrap().clone();
        let (mut max, mut opt) = (max, opt);
        if from_max {
            max.remove(&victim);
        } else {
            opt.remove(&victim);
        }
        let trt = TrtOption {
            min_shape: min,
            max_shape: max,
            opt_shape: opt,
            ..TrtOption::default()
        };
        match shape::derive(&trt) {
            Err(infergate_core::BackendError::MissingShapeBound { name, map }) => {
                prop_assert_eq!(name, victim);
                prop_assert_eq!(map, if from_max { "max_shape" } else { "opt_shape" });
            }
            other => prop_assert!(false, "expected MissingShapeBound, got {:?}", other),
        }
    }
}
