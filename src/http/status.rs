//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos que puede devolver el servidor:
//!
//! - **2xx**: Éxito (200, 204)
//! - **4xx**: Error del cliente (400, 404, 405, 413)
//! - **5xx**: Error del servidor (500, 501)

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,
    
    /// 204 No Content - Petición exitosa sin contenido en el body
    NoContent = 204,
    
    /// 400 Bad Request - Parámetros inválidos o malformados
    BadRequest = 400,
    
    /// 404 Not Found - Ruta o recurso no encontrado
    NotFound = 404,
    
    /// 405 Method Not Allowed - La ruta existe pero no acepta ese método
    MethodNotAllowed = 405,

    /// 413 Payload Too Large - El request supera el máximo de bytes
    PayloadTooLarge = 413,
    
    /// 500 Internal Server Error - Error interno del servidor
    InternalServerError = 500,
    
    /// 501 Not Implemented - El servidor no conoce el método del request
    NotImplemented = 501,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
    
    /// Retorna el texto de razón (reason phrase) asociado al código
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }
    
    /// Verifica si el código indica éxito (2xx)
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::StatusCode;
    /// assert!(StatusCode::Ok.is_success());
    /// assert!(StatusCode::NoContent.is_success());
    /// assert!(!StatusCode::NotFound.is_success());
    /// ```
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::NoContent)
    }
    
    /// Verifica si el código indica error del cliente (4xx)
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::StatusCode;
    /// assert!(StatusCode::BadRequest.is_client_error());
    /// assert!(!StatusCode::Ok.is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        let code = self.as_u16();
        (400..500).contains(&code)
    }
    
    /// Verifica si el código indica error del servidor (5xx)
    /// 
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::StatusCode;
    /// assert!(StatusCode::InternalServerError.is_server_error());
    /// assert!(!StatusCode::BadRequest.is_server_error());
    /// ```
    pub fn is_server_error(&self) -> bool {
        let code = self.as_u16();
        (500..600).contains(&code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formatea el código de estado para mostrarlo
    /// 
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
