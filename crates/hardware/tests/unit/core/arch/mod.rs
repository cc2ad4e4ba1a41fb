//! CSR file and privilege level tests.
