use std::{
    env,
    error::Error,
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufRead},
    path::Path,
};
use walkdir::WalkDir;

enum Test {
    /// The whole assembly of the file.
    Asm(Vec<String>),
    /// Lines the assembly has to contain.
    Contains(Vec<String>),
    /// Text that may not show up anywhere in the assembly.
    Lacks(Vec<String>),
    /// The kind of internal compiler error the file causes.
    Ice(String),
}

fn parse_file<P>(filename: P) -> Option<(Test, bool)>
where
    P: AsRef<Path>,
{
    let file = File::open(&filename)
        .unwrap_or_else(|_| panic!("Failed to open file {}", filename.as_ref().display()));
    let mut lines = io::BufReader::new(file).lines();
    let first_line = lines.next().expect("Empty test file").unwrap();

    let (first_line, ignore) = if first_line == "//ignore" {
        (lines.next().expect("Empty test file").unwrap(), true)
    } else {
        (first_line, false)
    };

    let mut expected = Vec::new();
    while let Some(Ok(line)) = lines.next() {
        if let Some(expect) = line.strip_prefix("//") {
            expected.push(expect.trim().to_owned());
        } else {
            break;
        }
    }

    let test = match first_line.as_str() {
        "//asm:" => Some(Test::Asm(expected)),
        "//contains:" => Some(Test::Contains(expected)),
        "//lacks:" => Some(Test::Lacks(expected)),
        "//ice:" if expected.len() == 1 => Some(Test::Ice(expected.remove(0))),
        _ => {
            println!(
                "cargo:warning=Failed to read test file `{}` starting with {}",
                filename.as_ref().display(),
                first_line
            );
            None
        }
    };

    test.map(|t| (t, ignore))
}

fn make_save(name: &OsStr) -> String {
    let name = name.to_string_lossy();

    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphabetic() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = env::var("OUT_DIR").unwrap();
    let input_dir = "test_files";

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", input_dir);
    let mut output = String::new();

    let mut entries: Vec<_> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    for (i, entry) in entries.iter().enumerate() {
        let path = entry.path();
        let Some((test, ignore)) = parse_file(path) else {
            continue;
        };
        let test = match test {
            Test::Asm(expected) => format!("asm_test({:?}, &{:?})", path.display(), expected),
            Test::Contains(expected) => {
                format!("contains_test({:?}, &{:?})", path.display(), expected)
            }
            Test::Lacks(expected) => format!("lacks_test({:?}, &{:?})", path.display(), expected),
            Test::Ice(kind) => format!("ice_test({:?}, {:?})", path.display(), kind),
        };

        let test_name = path.strip_prefix(input_dir).unwrap();
        let test_name = make_save(test_name.as_os_str());

        let test_specifier = match ignore {
            true => "#[test]\n#[ignore]",
            false => "#[test]",
        };

        let test = format!(
            "{}\nfn {}_{}() {{\n{};\n}}\n",
            test_specifier, test_name, i, test
        );

        output.push_str(&test);
    }

    fs::write(out_dir + "/tests.rs", output).expect("Failed to write to tests.rs");

    Ok(())
}
