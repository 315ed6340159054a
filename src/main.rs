use clap::{arg, crate_version, ArgGroup, Command};
use huffman_codec::{decode, encode, opcode_body_as_text, OpcodeMode};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help =
"Examples:
---------
Encode (packed bits):  `huffman -e -i my_input -o my_artifact`
Encode (ascii text):   `huffman -e -a -i my_input -o my_artifact`
Decode:                `huffman -d -i my_artifact -o my_output`
Decode, print opcodes: `huffman -d -p -i my_artifact -o my_output`";

    let cmd = Command::new("huffman")
        .about("encode or decode a file with a static Huffman tree")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(-e --encode "encode the input file").action(clap::ArgAction::SetTrue))
        .arg(arg!(-d --decode "decode the input file").action(clap::ArgAction::SetTrue))
        .arg(arg!(-a --ascii "use the ascii '0'/'1' opcode mode instead of packed bits")
            .action(clap::ArgAction::SetTrue))
        .arg(arg!(-p --print "also print the opcode body to stdout").action(clap::ArgAction::SetTrue))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .group(
            ArgGroup::new("action")
                .args(["encode", "decode"])
                .required(true),
        );

    let matches = cmd.get_matches();

    let path_in = matches.get_one::<String>("input").expect(RCH);
    let path_out = matches.get_one::<String>("output").expect(RCH);
    let mode = if matches.get_flag("ascii") {
        OpcodeMode::Text
    } else {
        OpcodeMode::Bits
    };

    let input = std::fs::read(path_in)?;

    if matches.get_flag("encode") {
        let artifact = encode(&input, mode)?;
        if matches.get_flag("print") {
            println!("{}", opcode_body_as_text(&artifact, mode)?);
        }
        std::fs::write(path_out, artifact)?;
    } else {
        if matches.get_flag("print") {
            println!("{}", opcode_body_as_text(&input, mode)?);
        }
        let restored = decode(&input, mode)?;
        std::fs::write(path_out, restored)?;
    }

    Ok(())
}
