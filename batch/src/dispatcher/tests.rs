/*
 * Copyright 2024 Fluence Labs Limited
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

use std::collections::BTreeSet;

use maplit::btreeset;
use nix::errno::Errno;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use msrbatch_test_utils::init_test_logging;
use msrbatch_test_utils::test_values::generate_random_targets;
use msrbatch_test_utils::test_values::register_value;
use msrbatch_msr::CoreAccess;
use msrbatch_msr::MSRBackend;
use msrbatch_msr::MSRResult;
use msrbatch_test_utils::AccessKind;
use msrbatch_test_utils::MockCore;
use msrbatch_test_utils::MockMSR;

use crate::Batch;
use crate::BatchDispatcher;
use crate::BatchError;
use crate::LogicalCoreId;
use crate::MSRError;
use crate::RegisterOperation;

/// Delegates to the mock, but register reads on `failing_core` panic.
struct PanickingBackend {
    inner: MockMSR,
    failing_core: LogicalCoreId,
}

struct PanickingCore {
    inner: MockCore,
    panics: bool,
}

impl MSRBackend for PanickingBackend {
    type Core = PanickingCore;

    fn attach(&self, core_id: LogicalCoreId) -> MSRResult<PanickingCore> {
        let inner = self.inner.attach(core_id)?;
        Ok(PanickingCore {
            inner,
            panics: core_id == self.failing_core,
        })
    }
}

impl CoreAccess for PanickingCore {
    fn core_id(&self) -> LogicalCoreId {
        self.inner.core_id()
    }

    fn read(&mut self, register_id: u32) -> MSRResult<u64> {
        if self.panics {
            panic!("register file of core {} is gone", self.inner.core_id());
        }
        self.inner.read(register_id)
    }

    fn write(&mut self, register_id: u32, value: u64) -> MSRResult<()> {
        self.inner.write(register_id, value)
    }
}

#[test]
fn read_then_masked_write_on_core_2() {
    init_test_logging();
    let mock = MockMSR::new().with_register(2, 0x10, 0xA0);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![
        RegisterOperation::new(2, 0x10),
        RegisterOperation::new(2, 0x10).with_write(0xFF, 0x0F),
    ]);

    let result = dispatcher.dispatch(&mut batch);

    assert!(result.is_ok(), "dispatch failed: {result:?}");
    let operations = batch.operations();
    assert_eq!(operations[0].read_value(), Some(0xA0));
    assert_eq!(operations[1].read_value(), Some(0xA0));
    assert_eq!(operations[1].write_value(), 0xAF);
    assert_eq!(mock.value(2, 0x10), Some(0xAF));
    assert_eq!(mock.attached_cores(), btreeset! {2.into()});
}

#[test]
fn executor_panic_is_reported_after_other_cores_finish() {
    init_test_logging();
    let mock = MockMSR::new()
        .with_register(0, 0x10, 3)
        .with_register(1, 0x10, 4);
    let backend = PanickingBackend {
        inner: mock.clone(),
        failing_core: 1.into(),
    };
    let dispatcher = BatchDispatcher::new(backend);
    let mut batch = Batch::new(vec![
        RegisterOperation::new(1, 0x10),
        RegisterOperation::new(0, 0x10),
    ]);

    let result = dispatcher.dispatch(&mut batch);

    match result {
        Err(BatchError::ExecutorPanicked { core_id, message }) => {
            assert_eq!(core_id, LogicalCoreId::new(1));
            assert_eq!(message, "register file of core 1 is gone");
        }
        other => panic!("unexpected dispatch result: {other:?}"),
    }
    assert_eq!(batch.operations()[1].read_value(), Some(3));
    assert_eq!(mock.attached_cores(), btreeset! {0.into(), 1.into()});
}

#[test]
fn redispatch_clears_outputs_of_previous_run() {
    let mut batch = Batch::new(vec![RegisterOperation::new(0, 0x10)]);
    let mock = MockMSR::new().with_register(0, 0x10, 9);
    BatchDispatcher::new(mock).dispatch(&mut batch).unwrap();
    assert_eq!(batch.operations()[0].read_value(), Some(9));

    let offline = BatchDispatcher::new(MockMSR::new().with_offline_core(0));
    assert!(offline.dispatch(&mut batch).is_err());

    let operation = &batch.operations()[0];
    assert_eq!(operation.read_value(), None);
    assert_eq!(operation.error(), Some(MSRError::pinning_failed(0.into())));

    let empty = BatchDispatcher::new(MockMSR::new());
    assert!(empty.dispatch(&mut batch).is_err());

    let operation = &batch.operations()[0];
    assert_eq!(operation.read_value(), None);
    assert_eq!(
        operation.error(),
        Some(MSRError::read_w_no_err(0x10, 0.into(), Errno::EIO))
    );
}

#[test]
fn masked_write_on_single_core() {
    init_test_logging();
    let mock = MockMSR::new().with_register(0, 0x611, 0xA0);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![RegisterOperation::new(0, 0x611).with_write(0xFF, 0x0F)]);

    dispatcher.dispatch(&mut batch).unwrap();

    let operation = &batch.operations()[0];
    assert_eq!(operation.read_value(), Some(0xA0));
    assert_eq!(operation.write_value(), 0xAF);
    assert_eq!(mock.value(0, 0x611), Some(0xAF));
}

#[test]
fn only_referenced_cores_are_attached() {
    init_test_logging();
    let mock = MockMSR::new()
        .with_register(0, 0x10, 0)
        .with_register(2, 0x10, 2)
        .with_register(5, 0x10, 5);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch: Batch = [5, 2, 5, 5, 2]
        .into_iter()
        .map(|core_id| RegisterOperation::new(core_id, 0x10))
        .collect();

    dispatcher.dispatch(&mut batch).unwrap();

    assert_eq!(mock.attached_cores(), btreeset! {2.into(), 5.into()});
    assert_eq!(mock.attaches().len(), 2);
    assert!(mock.accesses_on(0).is_empty());
}

#[test]
fn executors_run_off_the_calling_thread() {
    let mock = MockMSR::new()
        .with_register(0, 0x10, 0)
        .with_register(1, 0x10, 1);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![
        RegisterOperation::new(0, 0x10),
        RegisterOperation::new(1, 0x10),
    ]);

    dispatcher.dispatch(&mut batch).unwrap();

    let caller = std::thread::current().id();
    let threads = mock
        .attaches()
        .into_iter()
        .map(|(_, thread)| thread)
        .collect::<Vec<_>>();
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|thread| *thread != caller));
    assert_ne!(threads[0], threads[1]);
}

#[test]
fn empty_batch_touches_nothing() {
    let mock = MockMSR::new();
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::default();

    dispatcher.dispatch(&mut batch).unwrap();

    assert!(mock.accesses().is_empty());
}

#[test]
fn same_core_operations_keep_batch_order() {
    let mock = MockMSR::new()
        .with_register(1, 0x10, 0)
        .with_register(3, 0x10, 0);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![
        RegisterOperation::new(1, 0x10).with_write(1, u64::MAX),
        RegisterOperation::new(3, 0x10).with_write(10, u64::MAX),
        RegisterOperation::new(1, 0x10).with_write(2, u64::MAX),
        RegisterOperation::new(3, 0x10).with_write(20, u64::MAX),
        RegisterOperation::new(1, 0x10).with_write(3, u64::MAX),
    ]);

    dispatcher.dispatch(&mut batch).unwrap();

    assert_eq!(mock.writes_to(1, 0x10), vec![1, 2, 3]);
    assert_eq!(mock.writes_to(3, 0x10), vec![10, 20]);
    let reads = batch
        .operations()
        .iter()
        .map(|operation| operation.read_value())
        .collect::<Vec<_>>();
    assert_eq!(reads, vec![Some(0), Some(0), Some(1), Some(10), Some(2)]);
}

#[test]
fn first_failure_is_reported_and_others_complete() {
    init_test_logging();
    let mock = MockMSR::new()
        .with_register(0, 0x10, 7)
        .with_register(1, 0x10, 8);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![
        RegisterOperation::new(0, 0x10),
        RegisterOperation::new(1, 0x20),
        RegisterOperation::new(1, 0x10),
        RegisterOperation::new(0, 0x20),
    ]);

    let result = dispatcher.dispatch(&mut batch);

    let expected = MSRError::read_w_no_err(0x20, 1.into(), Errno::EIO);
    match result {
        Err(BatchError::OperationFailed {
            index,
            core_id,
            error,
        }) => {
            assert_eq!(index, 1);
            assert_eq!(core_id, LogicalCoreId::new(1));
            assert_eq!(error, expected);
        }
        other => panic!("unexpected dispatch result: {other:?}"),
    }

    let operations = batch.operations();
    assert_eq!(operations[0].read_value(), Some(7));
    assert_eq!(operations[1].error(), Some(expected));
    assert_eq!(operations[2].read_value(), Some(8));
    assert!(operations[3].is_failed());
}

#[test]
fn offline_core_fails_its_operations_only() {
    init_test_logging();
    let mock = MockMSR::new()
        .with_register(0, 0x10, 1)
        .with_offline_core(4);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![
        RegisterOperation::new(4, 0x10),
        RegisterOperation::new(0, 0x10),
        RegisterOperation::new(4, 0x10).with_write(1, u64::MAX),
    ]);

    let error = dispatcher.dispatch(&mut batch).unwrap_err();

    assert_eq!(error.code(), -(Errno::ENXIO as i32));
    let offline = MSRError::pinning_failed(4.into());
    let operations = batch.operations();
    assert_eq!(operations[0].error(), Some(offline));
    assert_eq!(operations[1].read_value(), Some(1));
    assert_eq!(operations[2].error(), Some(offline));
    assert_eq!(
        mock.accesses_on(4)
            .into_iter()
            .filter(|kind| !matches!(kind, AccessKind::Attach { .. }))
            .count(),
        0
    );
}

#[test]
fn random_batches_touch_exactly_their_cores() {
    let mut rng = SmallRng::seed_from_u64(0x4D5352);

    for size in [1, 3, 16, 64] {
        let targets = generate_random_targets(&mut rng, size, 0..8);
        let mock = targets
            .iter()
            .fold(MockMSR::new(), |mock, &(core_id, register_id)| {
                mock.with_register(core_id, register_id, register_value(core_id, register_id))
            });
        let dispatcher = BatchDispatcher::new(mock.clone());
        let mut batch: Batch = targets
            .iter()
            .map(|&(core_id, register_id)| RegisterOperation::new(core_id, register_id))
            .collect();

        dispatcher.dispatch(&mut batch).unwrap();

        let expected_cores = targets
            .iter()
            .map(|(core_id, _)| *core_id)
            .collect::<BTreeSet<LogicalCoreId>>();
        assert_eq!(mock.attached_cores(), expected_cores);
        assert_eq!(mock.attaches().len(), expected_cores.len());
        assert_eq!(batch.core_ids(), expected_cores);

        for operation in &batch {
            let expected = register_value(operation.core_id(), operation.register_id());
            assert_eq!(operation.read_value(), Some(expected));
        }
    }
}

#[test]
fn dispatcher_is_reusable() {
    let mock = MockMSR::new().with_counter(0, 0x10, 0, 1);
    let dispatcher = BatchDispatcher::new(mock.clone());
    let mut batch = Batch::new(vec![RegisterOperation::new(0, 0x10)]);

    dispatcher.dispatch(&mut batch).unwrap();
    dispatcher.dispatch(&mut batch).unwrap();

    assert_eq!(batch.operations()[0].read_value(), Some(1));
    assert_eq!(mock.attaches().len(), 2);
}
