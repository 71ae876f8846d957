mod harness;
mod properties;
mod protocol_roundtrip;
mod safety_stop;
mod scenarios;
