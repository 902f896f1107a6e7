use std::{path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::config::FlagTemplate;

/// How composed flags are shared between the schemas of one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagPolicy {
    /// The first planned schema stores its flags and every later schema's task reuses them, even
    /// when its own plan disagrees (for instance, a different output directory).
    FirstWriterWins,
    /// Every task uses the flags of its own plan. The stored flags are left alone.
    PerFile,
}

impl Default for FlagPolicy {
    fn default() -> Self {
        FlagPolicy::FirstWriterWins
    }
}

#[derive(Error, Debug)]
#[error("unknown flag policy '{0}' (expected 'first-writer' or 'per-file')")]
pub struct FlagPolicyError(String);

impl FromStr for FlagPolicy {
    type Err = FlagPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-writer" => Ok(FlagPolicy::FirstWriterWins),
            "per-file" => Ok(FlagPolicy::PerFile),
            e => Err(FlagPolicyError(e.to_owned())),
        }
    }
}

/// Per-configuration state the compiler invocation is rendered from.
///
/// Must not be shared between threads while generators are being processed; `&mut` access is
/// what serializes writers.
#[derive(Debug, Clone)]
pub struct InvocationEnv {
    protoc: PathBuf,
    include_template: FlagTemplate,
    flag_template: FlagTemplate,
    policy: FlagPolicy,
    flags: Vec<String>,
    flags_computed: bool,
    // Build relative include directories of the C++ side.
    incpaths: Vec<String>,
    // Build relative `protoc_includes`.
    protoc_incpaths: Vec<String>,
}

impl InvocationEnv {
    pub fn new(
        protoc: PathBuf,
        include_template: FlagTemplate,
        flag_template: FlagTemplate,
        policy: FlagPolicy,
    ) -> InvocationEnv {
        InvocationEnv {
            protoc,
            include_template,
            flag_template,
            policy,
            flags: vec![],
            flags_computed: false,
            incpaths: vec![],
            protoc_incpaths: vec![],
        }
    }

    pub fn protoc(&self) -> &PathBuf {
        &self.protoc
    }

    pub fn policy(&self) -> FlagPolicy {
        self.policy
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn flags_computed(&self) -> bool {
        self.flags_computed
    }

    /// Stores `flags` unless some earlier plan already did. Returns whether they were stored.
    ///
    /// There is no merging: a later plan asking for a different output directory, or for another
    /// language, does not change what is stored.
    pub fn store_flags(&mut self, flags: &[String]) -> bool {
        if self.flags_computed {
            return false;
        }
        self.flags = flags.to_vec();
        self.flags_computed = true;
        true
    }

    /// Forgets the stored flags so the next plan stores its own.
    pub fn reset_flags(&mut self) {
        self.flags.clear();
        self.flags_computed = false;
    }

    /// The flags a task planned with `planned` should be invoked with.
    pub fn flags_for<'a>(&'a self, planned: &'a [String]) -> &'a [String] {
        match self.policy {
            FlagPolicy::FirstWriterWins if self.flags_computed => &self.flags,
            _ => planned,
        }
    }

    pub fn incpaths(&self) -> &[String] {
        &self.incpaths
    }

    pub fn set_incpaths(&mut self, incpaths: Vec<String>) {
        self.incpaths = incpaths;
    }

    pub fn protoc_incpaths(&self) -> &[String] {
        &self.protoc_incpaths
    }

    /// Unlike the flags, these are replaced on every call.
    pub fn set_protoc_incpaths(&mut self, incpaths: Vec<String>) {
        self.protoc_incpaths = incpaths;
    }

    /// Everything between the compiler and the input:
    /// `${PROTOC_FL:PROTOC_FLAGS} ${PROTOC_ST:INCPATHS} ${PROTOC_ST:PROTOC_INCPATHS}`.
    pub fn render_args(&self, planned: &[String]) -> Vec<String> {
        let flags = self
            .flags_for(planned)
            .iter()
            .map(|f| self.flag_template.render(f));
        let includes = self
            .incpaths
            .iter()
            .chain(self.protoc_incpaths.iter())
            .map(|p| self.include_template.render(p));
        flags.chain(includes).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn env(policy: FlagPolicy) -> InvocationEnv {
        InvocationEnv::new(
            PathBuf::from("protoc"),
            FlagTemplate::new("-I%s"),
            FlagTemplate::new("%s"),
            policy,
        )
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_writer_wins() {
        let mut env = env(FlagPolicy::FirstWriterWins);
        assert!(!env.flags_computed());
        assert!(env.store_flags(&strings(&["--cpp_out=."])));
        assert!(!env.store_flags(&strings(&["--cpp_out=sub", "--python_out=sub"])));
        assert_eq!(env.flags(), &strings(&["--cpp_out=."])[..]);
        assert_eq!(
            env.flags_for(&strings(&["--python_out=sub"])),
            &strings(&["--cpp_out=."])[..]
        );

        env.reset_flags();
        assert!(env.store_flags(&strings(&["--python_out=sub"])));
        assert_eq!(env.flags(), &strings(&["--python_out=sub"])[..]);
    }

    #[test]
    fn per_file_uses_the_plan() {
        let mut env = env(FlagPolicy::PerFile);
        env.store_flags(&strings(&["--cpp_out=."]));
        let planned = strings(&["--cpp_out=sub"]);
        assert_eq!(env.flags_for(&planned), &planned[..]);
    }

    #[test]
    fn args_order() {
        let mut env = env(FlagPolicy::FirstWriterWins);
        env.store_flags(&strings(&["--cpp_out=.", "--python_out=."]));
        env.set_incpaths(strings(&["../inc"]));
        env.set_protoc_incpaths(strings(&["../proto", "../vendor"]));
        assert_eq!(
            env.render_args(&[]),
            strings(&[
                "--cpp_out=.",
                "--python_out=.",
                "-I../inc",
                "-I../proto",
                "-I../vendor"
            ])
        );
    }

    #[test]
    fn policy_from_str() {
        assert_eq!(
            "first-writer".parse::<FlagPolicy>().unwrap(),
            FlagPolicy::FirstWriterWins
        );
        assert_eq!("per-file".parse::<FlagPolicy>().unwrap(), FlagPolicy::PerFile);
        let err = "merge".parse::<FlagPolicy>().unwrap_err();
        assert!(err.to_string().contains("'merge'"));
        assert_eq!(FlagPolicy::default(), FlagPolicy::FirstWriterWins);
    }
}
