use gpubridge_marshal::{read_struct_array, DecodeError, FieldValues, NativeAddress, NativeView, Value};
use gpubridge_native::abi::{self, CompilationMessageType, DeviceLostReason, ErrorType};

/// What a successful native callback delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackPayload {
    /// A newly created native object (adapter, device, pipeline).
    Handle(NativeAddress),
    /// Completion with no data (buffer map, queue work done).
    Unit,
    /// Result of popping an error scope.
    ErrorScope {
        error_type: ErrorType,
        message: Option<String>,
    },
    /// Shader compilation messages, in native order.
    Compilation(Vec<CompilationMessage>),
    DeviceLost {
        reason: DeviceLostReason,
        message: Option<String>,
    },
}

impl CallbackPayload {
    pub fn handle(&self) -> Option<NativeAddress> {
        match self {
            CallbackPayload::Handle(addr) => Some(*addr),
            _ => None,
        }
    }
}

/// One entry of a native compilation info record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationMessage {
    pub message: String,
    pub kind: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

fn field<'a>(values: &'a FieldValues, name: &str) -> Result<&'a Value, DecodeError> {
    values.get(name).ok_or_else(|| DecodeError::MissingField { field: name.to_string() })
}

fn u64_field(values: &FieldValues, name: &str) -> Result<u64, DecodeError> {
    field(values, name)?
        .as_u64()
        .ok_or_else(|| DecodeError::MissingField { field: name.to_string() })
}

fn u32_field(values: &FieldValues, name: &str) -> Result<u32, DecodeError> {
    field(values, name)?
        .as_u32()
        .ok_or_else(|| DecodeError::MissingField { field: name.to_string() })
}

unsafe fn message_from_record(record: &FieldValues) -> Result<CompilationMessage, DecodeError> {
    let view = field(record, "message")?
        .as_struct()
        .ok_or_else(|| DecodeError::MissingField { field: "message".to_string() })?;
    let data = field(view, "data")?.as_address().unwrap_or(NativeAddress::NULL);
    let length = field(view, "length")?.as_size().unwrap_or(0);
    let text = gpubridge_marshal::string_from_view(data, length)?.unwrap_or_default();

    Ok(CompilationMessage {
        message: text,
        kind: CompilationMessageType::from_raw(u32_field(record, "type")?),
        line_num: u64_field(record, "lineNum")?,
        line_pos: u64_field(record, "linePos")?,
        offset: u64_field(record, "offset")?,
        length: u64_field(record, "length")?,
    })
}

/// Decodes a native `CompilationInfo` record and its message array.
///
/// # Safety
/// `info` must be null or point to a compilation info record that stays
/// valid for the duration of the call, as it does inside the callback.
pub unsafe fn decode_compilation_info(info: NativeAddress) -> Result<Vec<CompilationMessage>, DecodeError> {
    if info.is_null() {
        return Ok(Vec::new());
    }
    let layouts = abi::layouts();
    let header = NativeView::from_raw(info, layouts.compilation_info.size())?.decode_struct(&layouts.compilation_info)?;
    let count = field(&header, "messageCount")?.as_size().unwrap_or(0);
    let messages = field(&header, "messages")?.as_address().unwrap_or(NativeAddress::NULL);

    read_struct_array(messages, count, &layouts.compilation_message)?
        .iter()
        .map(|record| message_from_record(record))
        .collect()
}
