//! # Espera de Readiness
//! src/server/poll.rs
//!
//! Envoltura mínima sobre `poll(2)` para esperar, con timeout, a que un socket
//! no bloqueante esté listo para leer o escribir. La usan tanto la conexión
//! como el loop de `accept`.

use std::io;
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

/// Qué evento se espera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

impl Interest {
    fn events(self) -> libc::c_short {
        match self {
            Interest::Readable => libc::POLLIN,
            Interest::Writable => libc::POLLOUT,
        }
    }
}

/// Espera hasta `timeout` a que `socket` esté listo
///
/// Retorna `Ok(true)` si está listo (un hang-up o error pendiente también
/// cuentan: la siguiente operación los reporta), `Ok(false)` si expiró el
/// tiempo. Una interrupción por señal reintenta con el tiempo restante.
pub fn wait<S: AsRawFd>(socket: &S, interest: Interest, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let timeout_ms = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        let mut fds = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: interest.events(),
            revents: 0,
        };

        // SAFETY: `fds` es un único pollfd válido que vive durante toda la llamada
        let rc = unsafe { libc::poll(&mut fds, 1, timeout_ms) };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }

        return Ok(rc > 0);
    }
}
