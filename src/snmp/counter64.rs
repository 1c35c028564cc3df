use crate::error::PollError;
use crate::models::value::{MAX_SAFE_INTEGER, MetricValue};

/// Декодирует буфер Counter64 (big-endian, до 9 байт).
///
/// Девятый байт появляется, когда старший бит значения установлен: транспорт
/// кодирует его как знаковое целое и добавляет ведущий нулевой байт.
/// При `convert_to_number` значения в безопасном диапазоне f64 возвращаются
/// как `Number`, всё остальное как `BigInt`.
pub fn decode_counter64(
    oid: &str,
    buf: &[u8],
    convert_to_number: bool,
) -> Result<MetricValue, PollError> {
    let bytes = match buf.len() {
        9 => &buf[1..],
        0..=8 => buf,
        len => {
            return Err(PollError::Decode {
                oid: oid.to_string(),
                len,
            });
        }
    };

    let mut padded = [0u8; 8];
    padded[8 - bytes.len()..].copy_from_slice(bytes);
    let value = u64::from_be_bytes(padded);

    if convert_to_number && value <= MAX_SAFE_INTEGER {
        Ok(MetricValue::Number(value as f64))
    } else {
        Ok(MetricValue::BigInt(value))
    }
}
