//! Argument and result serialization.
//!
//! Values cross the process boundary as pickles. Two codecs exist: plain
//! `pickle` and `dill`. On the wire both are the pickle format (dill reads
//! and writes ordinary pickles for plain data); they differ in which Python
//! module the generated program imports, and therefore in what the function
//! may return. Objects only dill can express fail to decode here and are
//! reported as a deserialization error.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_pickle::{DeOptions, SerOptions, Value};

use crate::args::ArgPayload;
use crate::error::VenvError;

/// What the function produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Zero-length output artifact: the function returned `None` or nothing.
    Absent,
    Returned(Value),
}

impl ExecutionResult {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Absent => None,
            Self::Returned(v) => Some(v),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Absent => None,
            Self::Returned(v) => Some(v),
        }
    }

    /// Convert the returned value into `T`; `Ok(None)` when absent.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_pickle::Error> {
        self.value()
            .map(|v| serde_pickle::from_value(v.clone()))
            .transpose()
    }
}

/// Pickle dialect spoken with the environment's interpreter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireOptions {
    /// Python 2 target: write protocol 2, read Python 2 `str` as text
    pub python2: bool,
}

impl WireOptions {
    pub fn for_major(major: u32) -> Self {
        Self { python2: major == 2 }
    }

    fn ser(&self) -> SerOptions {
        let opts = SerOptions::new();
        if self.python2 {
            opts.proto_v2()
        } else {
            opts
        }
    }

    fn de(&self) -> DeOptions {
        let opts = DeOptions::new();
        if self.python2 {
            opts.decode_strings()
        } else {
            opts
        }
    }
}

/// Serialization capability used for the input and output artifacts.
pub trait Codec: Send + Sync {
    /// Python module the generated program imports to load and dump values.
    fn module_name(&self) -> &'static str;

    fn encode(&self, payload: &ArgPayload) -> Result<Vec<u8>, VenvError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, VenvError>;
}

fn encode_with(
    module: &'static str,
    wire: WireOptions,
    payload: &ArgPayload,
) -> Result<Vec<u8>, VenvError> {
    serde_pickle::to_vec(payload, wire.ser()).map_err(|e| VenvError::Serialization {
        codec: module,
        message: e.to_string(),
    })
}

fn decode_with(module: &'static str, wire: WireOptions, bytes: &[u8]) -> Result<Value, VenvError> {
    serde_pickle::value_from_slice(bytes, wire.de()).map_err(|e| VenvError::Deserialization {
        codec: module,
        message: e.to_string(),
    })
}

/// Standard library `pickle`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickleCodec {
    pub wire: WireOptions,
}

impl Codec for PickleCodec {
    fn module_name(&self) -> &'static str {
        "pickle"
    }

    fn encode(&self, payload: &ArgPayload) -> Result<Vec<u8>, VenvError> {
        encode_with(self.module_name(), self.wire, payload)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, VenvError> {
        decode_with(self.module_name(), self.wire, bytes)
    }
}

/// `dill`, which must be importable inside the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DillCodec {
    pub wire: WireOptions,
}

impl Codec for DillCodec {
    fn module_name(&self) -> &'static str {
        "dill"
    }

    fn encode(&self, payload: &ArgPayload) -> Result<Vec<u8>, VenvError> {
        encode_with(self.module_name(), self.wire, payload)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, VenvError> {
        decode_with(self.module_name(), self.wire, bytes)
    }
}

/// Pick the codec for an environment.
pub fn select_codec(use_dill: bool, wire: WireOptions) -> Box<dyn Codec> {
    if use_dill {
        Box::new(DillCodec { wire })
    } else {
        Box::new(PickleCodec { wire })
    }
}

/// Write `{"args": ..., "kwargs": ...}` to `path` if there is anything to pass.
///
/// Returns whether the file was written. With no arguments nothing is
/// written and the generated program must not try to read it.
pub fn write_args(codec: &dyn Codec, path: &Path, payload: &ArgPayload) -> Result<bool, VenvError> {
    if payload.is_empty() {
        return Ok(false);
    }
    let bytes = codec.encode(payload)?;
    fs::write(path, bytes).map_err(|e| VenvError::io(format!("write {}", path.display()), e))?;
    Ok(true)
}

/// Newline-joined string args. No args gives an empty file.
pub fn write_string_args(path: &Path, strings: &[String]) -> Result<(), VenvError> {
    fs::write(path, strings.join("\n"))
        .map_err(|e| VenvError::io(format!("write {}", path.display()), e))
}

/// Read the output artifact. Zero length means [`ExecutionResult::Absent`].
pub fn read_result(codec: &dyn Codec, path: &Path) -> Result<ExecutionResult, VenvError> {
    let bytes = fs::read(path).map_err(|e| VenvError::io(format!("read {}", path.display()), e))?;
    if bytes.is_empty() {
        return Ok(ExecutionResult::Absent);
    }
    match codec.decode(&bytes) {
        Ok(value) => Ok(ExecutionResult::Returned(value)),
        Err(e) => {
            tracing::error!(
                "Error deserializing result. Note that result deserialization \
                 is not supported across major Python versions."
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::InvocationArgs;
    use serde_pickle::HashableValue;

    fn pickle() -> PickleCodec {
        PickleCodec::default()
    }

    fn write_raw(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
        let p = dir.join("script.out");
        fs::write(&p, bytes).unwrap();
        p
    }

    #[test]
    fn test_no_args_writes_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("script.in");
        let payload = InvocationArgs::new().string_arg("x").resolve().payload;
        assert!(!write_args(&pickle(), &path, &payload).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_args_file_holds_args_and_kwargs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("script.in");
        let payload = InvocationArgs::new().arg(2).arg(3).kwarg("k", "v").resolve().payload;
        assert!(write_args(&pickle(), &path, &payload).unwrap());

        let value =
            serde_pickle::value_from_slice(&fs::read(&path).unwrap(), DeOptions::new()).unwrap();
        let Value::Dict(map) = value else {
            panic!("expected dict, got {value:?}");
        };
        assert_eq!(
            map[&HashableValue::String("args".into())],
            Value::List(vec![Value::I64(2), Value::I64(3)])
        );
        let Value::Dict(kwargs) = &map[&HashableValue::String("kwargs".into())] else {
            panic!("kwargs should be a dict");
        };
        assert_eq!(
            kwargs[&HashableValue::String("k".into())],
            Value::String("v".into())
        );
    }

    #[test]
    fn test_string_args_newline_joined() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("string_args.txt");
        write_string_args(&path, &["alpha".to_string(), "beta".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "alpha\nbeta");

        write_string_args(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_zero_length_result_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_raw(tmp.path(), b"");
        let result = read_result(&pickle(), &path).unwrap();
        assert!(result.is_absent());
        assert_eq!(result.decode::<i64>().unwrap(), None);
    }

    #[test]
    fn test_false_like_results_are_not_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let cases = [
            (
                serde_pickle::to_vec(&0i64, SerOptions::new()).unwrap(),
                Value::I64(0),
            ),
            (
                serde_pickle::to_vec(&"", SerOptions::new()).unwrap(),
                Value::String(String::new()),
            ),
            (
                serde_pickle::to_vec(&Vec::<i64>::new(), SerOptions::new()).unwrap(),
                Value::List(vec![]),
            ),
        ];
        for (bytes, expected) in cases {
            assert!(!bytes.is_empty());
            let path = write_raw(tmp.path(), &bytes);
            assert_eq!(
                read_result(&pickle(), &path).unwrap(),
                ExecutionResult::Returned(expected)
            );
        }
    }

    #[test]
    fn test_reads_python_protocol_4_pickles() {
        let tmp = tempfile::tempdir().unwrap();
        // pickle.dumps(5, protocol=4)
        let path = write_raw(tmp.path(), &[128, 4, 75, 5, 46]);
        let result = read_result(&pickle(), &path).unwrap();
        assert_eq!(result, ExecutionResult::Returned(Value::I64(5)));
        assert_eq!(result.decode::<i64>().unwrap(), Some(5));

        // pickle.dumps({'a': [1, 'x']}, protocol=4)
        let path = write_raw(
            tmp.path(),
            &[
                128, 4, 149, 18, 0, 0, 0, 0, 0, 0, 0, 125, 148, 140, 1, 97, 148, 93, 148, 40, 75,
                1, 140, 1, 120, 148, 101, 115, 46,
            ],
        );
        let decoded: serde_json::Value = read_result(&DillCodec::default(), &path)
            .unwrap()
            .decode()
            .unwrap()
            .unwrap();
        assert_eq!(decoded, serde_json::json!({"a": [1, "x"]}));
    }

    #[test]
    fn test_garbage_result_is_deserialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_raw(tmp.path(), b"definitely not a pickle");
        let err = read_result(&pickle(), &path).unwrap_err();
        assert!(matches!(
            err,
            VenvError::Deserialization {
                codec: "pickle",
                ..
            }
        ));
        assert!(err
            .to_string()
            .contains("not supported across major Python versions"));
    }

    #[test]
    fn test_missing_result_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_result(&pickle(), &tmp.path().join("script.out")).unwrap_err();
        assert!(matches!(err, VenvError::Io { .. }));
    }

    #[test]
    fn test_select_codec() {
        assert_eq!(
            select_codec(false, WireOptions::default()).module_name(),
            "pickle"
        );
        assert_eq!(
            select_codec(true, WireOptions::for_major(2)).module_name(),
            "dill"
        );
    }

    #[test]
    fn test_python2_wire_writes_protocol_2() {
        let codec = PickleCodec {
            wire: WireOptions::for_major(2),
        };
        let bytes = codec
            .encode(&InvocationArgs::new().arg(1).resolve().payload)
            .unwrap();
        assert_eq!(&bytes[..2], &[0x80, 2]);
    }
}
