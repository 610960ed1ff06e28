use std::net::TcpListener;

/// Bind a TCP listener on the given host and port.
pub fn listen_with_host_port(host: &str, port: u16) -> Result<TcpListener, std::io::Error> {
    TcpListener::bind((host, port))
}
