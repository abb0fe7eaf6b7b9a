use pyo3::exceptions::PyException;
use pyo3::prelude::*;

use crate::{decompress, Error};

pyo3::create_exception!(lzo_stream, LzoError, PyException, "Any kind of error.");

// One Python exception class per decoder error
pyo3::create_exception!(lzo_stream, LookbehindOverrunError, LzoError, "Likely indicates bad compressed LZO input.");
pyo3::create_exception!(lzo_stream, OutputOverrunError, LzoError, "Output buffer was not large enough to store the decompression result.");
pyo3::create_exception!(lzo_stream, InputOverrunError, LzoError, "Compressed input buffer is truncated.");
pyo3::create_exception!(lzo_stream, InputNotConsumedError, LzoError, "Decompression succeeded, but input buffer has remaining data.");
pyo3::create_exception!(lzo_stream, InvalidFirstOpcodeError, LzoError, "The stream starts with a reserved opcode.");
pyo3::create_exception!(lzo_stream, LengthOverflowError, LzoError, "A length escape exceeded the accepted maximum.");
pyo3::create_exception!(lzo_stream, UnsupportedError, LzoError, "The operation is not supported.");

fn lzo_error_to_pyerr(error: Error) -> PyErr {
    let message = error.to_string();
    match error {
        Error::LookbehindOverrun { .. } => LookbehindOverrunError::new_err(message),
        Error::OutputOverrun => OutputOverrunError::new_err(message),
        Error::InputOverrun => InputOverrunError::new_err(message),
        Error::InputNotConsumed => InputNotConsumedError::new_err(message),
        Error::InvalidFirstOpcode(_) => InvalidFirstOpcodeError::new_err(message),
        Error::LengthOverflow => LengthOverflowError::new_err(message),
        Error::Unsupported(_) => UnsupportedError::new_err(message),
        Error::Io(e) => e.into(),
    }
}

/// Decompress LZO1X data.
///
/// With `buffer_size`, the output must fit in that many bytes and the input
/// must be consumed exactly; without it the output grows as needed.
#[pyfunction(name = "decompress")]
#[pyo3(signature = (data, buffer_size=None))]
fn py_decompress(data: &[u8], buffer_size: Option<usize>) -> PyResult<Vec<u8>> {
    match buffer_size {
        Some(size) => {
            let mut dst = vec![0u8; size];
            let written = decompress::decompress(data, &mut dst).map_err(lzo_error_to_pyerr)?;
            dst.truncate(written);
            Ok(dst)
        }
        None => decompress::decompress_to_vec(data).map_err(lzo_error_to_pyerr),
    }
}

#[pymodule]
fn lzo_stream(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_decompress, m)?)?;

    // Add exception classes to the module
    m.add("LzoError", m.py().get_type::<LzoError>())?;
    m.add("LookbehindOverrunError", m.py().get_type::<LookbehindOverrunError>())?;
    m.add("OutputOverrunError", m.py().get_type::<OutputOverrunError>())?;
    m.add("InputOverrunError", m.py().get_type::<InputOverrunError>())?;
    m.add("InputNotConsumedError", m.py().get_type::<InputNotConsumedError>())?;
    m.add("InvalidFirstOpcodeError", m.py().get_type::<InvalidFirstOpcodeError>())?;
    m.add("LengthOverflowError", m.py().get_type::<LengthOverflowError>())?;
    m.add("UnsupportedError", m.py().get_type::<UnsupportedError>())?;

    Ok(())
}
