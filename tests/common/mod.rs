#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use std::path::PathBuf;

    /// Creates a temporary file with a unique name that outlives the handle
    pub fn create_temp_spec(content: &str, ext: &str) -> PathBuf {
        let mut file = tempfile::Builder::new()
            .prefix("brrtmock_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let (_, path) = file.keep().unwrap();
        path
    }

    pub fn create_temp_yaml(content: &str) -> PathBuf {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> PathBuf {
        create_temp_spec(content, "json")
    }

    /// Cleanup temporary files (best effort)
    pub fn cleanup_temp_files(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub mod fixtures {
    /// Swagger 2.0 pet store with a base path, global produces and examples.
    pub const PETSTORE_V2: &str = r#"
swagger: "2.0"
info:
  title: Pets
  version: "1.0"
basePath: /v1
produces:
  - application/json
  - application/xml
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: limit
          in: query
          type: integer
      responses:
        '200':
          description: pets
          examples:
            application/json: [{"id": 1, "name": "Rex"}]
          headers:
            X-Total:
              type: integer
              minimum: 1
              maximum: 1
    post:
      operationId: addPet
      parameters:
        - name: pet
          in: body
          schema:
            $ref: '#/definitions/Pet'
      responses:
        '201':
          description: created
          schema:
            $ref: '#/definitions/Pet'
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        type: integer
    get:
      operationId: getPet
      responses:
        '200':
          description: a pet
          schema:
            $ref: '#/definitions/Pet'
    delete:
      operationId: deletePet
      responses:
        '204':
          description: deleted
definitions:
  Pet:
    type: object
    required: [id, name]
    properties:
      id:
        type: integer
        minimum: 1
        maximum: 99
      name:
        type: string
        enum: [Rex, Tom]
"#;

    /// OpenAPI 3 document with content maps, named examples and header schemas.
    pub const PETSTORE_V3: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1.0"
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        '200':
          description: pets
          headers:
            X-Rate-Limit:
              schema:
                type: integer
                minimum: 10
                maximum: 10
          content:
            application/json:
              examples:
                only:
                  value: [{"id": 7, "name": "Tom"}]
            text/html:
              example: "<ul><li>Tom</li></ul>"
  /pets/{petId}:
    get:
      operationId: getPet
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: integer
        - name: verbose
          in: query
          schema:
            type: boolean
        - name: X-Trace
          in: header
          schema:
            type: integer
      responses:
        '200':
          description: a pet
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        default:
          description: error
          content:
            application/json:
              example: {"error": "boom"}
  /ping:
    get:
      responses:
        '204':
          description: nothing
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
        name:
          type: string
"#;
}

pub mod test_server {
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Once;
    use std::time::Duration;

    static MAY_INIT: Once = Once::new();

    /// Ensures May coroutines are configured only once
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// A local address nothing is listening on yet.
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub struct RawResponse {
        pub status: u16,
        /// Lowercased header names
        pub headers: HashMap<String, String>,
        pub body: String,
    }

    pub fn parse_response(resp: &str) -> RawResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }
}
